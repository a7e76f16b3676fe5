//! Motor link error types.

use diywheel_errors::{Classify, WheelErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotorLinkError {
    #[error("Motor link used before setup")]
    NotConfigured,

    #[error("Invalid motor node id: {0:#04x}")]
    InvalidNode(u8),

    #[error("Payload too long: {0} bytes (max 8 including command)")]
    PayloadTooLong(usize),

    #[error("No reply to command {command:#04x} within {timeout_ms} ms")]
    Timeout { command: u8, timeout_ms: u64 },

    #[error("Reply to command {command:#04x} too short: {len} bytes")]
    ShortReply { command: u8, len: usize },

    #[error("Setup step '{step}' failed: {source}")]
    Setup {
        step: &'static str,
        #[source]
        source: Box<MotorLinkError>,
    },

    #[error("Bus error: {0}")]
    Bus(#[from] std::io::Error),
}

pub type MotorLinkResult<T> = Result<T, MotorLinkError>;

impl Classify for MotorLinkError {
    fn kind(&self) -> WheelErrorKind {
        match self {
            MotorLinkError::NotConfigured
            | MotorLinkError::InvalidNode(_)
            | MotorLinkError::Setup { .. } => WheelErrorKind::SetupFailure,
            MotorLinkError::Timeout { .. } | MotorLinkError::Bus(_) => WheelErrorKind::TransientIo,
            MotorLinkError::PayloadTooLong(_) | MotorLinkError::ShortReply { .. } => {
                WheelErrorKind::ProtocolParse
            }
        }
    }
}
