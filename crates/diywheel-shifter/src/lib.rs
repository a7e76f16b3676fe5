//! H-pattern shifter for the DIY wheel.
//!
//! Two raw lever axes are quantized into buckets, the bucket pair is looked
//! up in a static [`ShiftTable`], and the resulting gear drives one button per
//! gear. At most one gear button is ever asserted.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod quantize;
pub mod shifter;
pub mod types;

pub use quantize::{bucket, map_range};
pub use shifter::{DEFAULT_BUTTON_BASE, GearChange, Shifter};
pub use types::*;

use diywheel_errors::{Classify, WheelErrorKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShifterError {
    #[error("Shift table is empty")]
    EmptyTable,

    #[error("Shift table row {row} has {actual} columns, expected {expected}")]
    RaggedTable {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

pub type ShifterResult<T> = Result<T, ShifterError>;

impl Classify for ShifterError {
    fn kind(&self) -> WheelErrorKind {
        WheelErrorKind::SetupFailure
    }
}
