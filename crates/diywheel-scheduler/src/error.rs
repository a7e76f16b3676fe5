//! Error types for the scheduler crate.

use diywheel_errors::{Classify, WheelErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Tick period must be non-zero")]
    ZeroPeriod,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl Classify for SchedulerError {
    fn kind(&self) -> WheelErrorKind {
        WheelErrorKind::SetupFailure
    }
}
