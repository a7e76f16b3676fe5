//! Pedal calibration
//!
//! Maps a raw analog reading onto the controller axis range `0..=32767`
//! using static per-pedal bounds.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod types;

pub use types::*;

use diywheel_errors::{Classify, WheelErrorKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("Calibration max {max} must be greater than min {min}")]
    EmptyRange { min: i32, max: i32 },
}

pub type CalibrationResult<T> = Result<T, CalibrationError>;

impl Classify for CalibrationError {
    fn kind(&self) -> WheelErrorKind {
        WheelErrorKind::SetupFailure
    }
}
