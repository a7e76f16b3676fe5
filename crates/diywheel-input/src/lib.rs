//! Input aggregation for the DIY wheel.
//!
//! Three independent sources feed the virtual controller through
//! [`ControllerSink`]:
//!
//! - [`line`]: comma-separated integer records from the host (lever axes,
//!   auxiliary axes, sequential shift triggers)
//! - [`frame`]: 3-byte accessory button frames
//! - [`pedals`]: calibrated analog pedals, sampled by the control loop
//!
//! Each source is the only writer of the axes and buttons it is configured
//! with.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod frame;
pub mod line;
pub mod pedals;
pub mod sink;
pub mod stats;

pub use frame::{AccessoryMap, DEFAULT_MARKER, FrameDecoder, FrameListener, MASK_BITS};
pub use line::{
    FIELD_SLOTS, LineListener, LineMapping, LineProtocol, NEUTRAL_THRESHOLD, NeutralButton,
    parse_record,
};
pub use pedals::{AnalogSource, Pedal, PedalSet};
pub use sink::ControllerSink;
pub use stats::ListenerStats;

use diywheel_errors::{Classify, WheelErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Field {index} is not an integer: {text:?}")]
    InvalidField {
        index: usize,
        text: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("Analog channel {channel} read failed: {reason}")]
    Analog { channel: usize, reason: String },

    #[error("Input stream error: {0}")]
    Io(#[from] std::io::Error),
}

pub type InputResult<T> = Result<T, InputError>;

impl Classify for InputError {
    fn kind(&self) -> WheelErrorKind {
        match self {
            InputError::InvalidField { .. } => WheelErrorKind::ProtocolParse,
            InputError::Analog { .. } | InputError::Io(_) => WheelErrorKind::TransientIo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let Err(source) = "abc".parse::<i32>() else {
            return;
        };
        let err = InputError::InvalidField {
            index: 0,
            text: "abc".into(),
            source,
        };
        insta::assert_snapshot!(err.to_string(), @r#"Field 0 is not an integer: "abc""#);
        assert_eq!(err.kind(), WheelErrorKind::ProtocolParse);
    }
}
