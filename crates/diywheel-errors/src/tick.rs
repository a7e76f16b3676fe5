//! Consuming errors at the tick boundary.

use crate::kind::{Classify, WheelErrorKind};

/// Log-and-discard for results produced inside the control loop or a
/// listener.
///
/// The log level follows the error kind: parse failures at `debug`,
/// transient I/O at `warn`, setup failures at `error`.
pub trait TickResultExt<T> {
    /// Log the error (if any) against `operation` and return the success
    /// value as an `Option`.
    fn consume(self, operation: &'static str) -> Option<T>;
}

impl<T, E: Classify> TickResultExt<T> for Result<T, E> {
    fn consume(self, operation: &'static str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                match e.kind() {
                    WheelErrorKind::ProtocolParse => {
                        tracing::debug!(operation, error = %e, "discarded malformed input")
                    }
                    WheelErrorKind::TransientIo => {
                        tracing::warn!(operation, error = %e, "transaction failed")
                    }
                    WheelErrorKind::SetupFailure => {
                        tracing::error!(operation, error = %e, "setup failure")
                    }
                }
                None
            }
        }
    }
}
