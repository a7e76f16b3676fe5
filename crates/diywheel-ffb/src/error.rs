//! Effect management errors.

use diywheel_errors::{Classify, WheelErrorKind};
use thiserror::Error;

use crate::effects::EffectKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error("Invalid effect id: {0}")]
    InvalidEffectId(u8),

    #[error("Effect pool is full")]
    PoolFull,

    #[error("Parameter {name} out of range: {value} (expected {min}..={max})")]
    ParameterOutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Effect {id} is {kind:?}, cannot take {parameter} parameters")]
    KindMismatch {
        id: u8,
        kind: EffectKind,
        parameter: &'static str,
    },
}

pub type EffectResult<T> = Result<T, EffectError>;

impl EffectError {
    pub(crate) fn out_of_range(name: &'static str, value: impl Into<i64>, min: i64, max: i64) -> Self {
        EffectError::ParameterOutOfRange {
            name,
            value: value.into(),
            min,
            max,
        }
    }
}

impl Classify for EffectError {
    fn kind(&self) -> WheelErrorKind {
        WheelErrorKind::ProtocolParse
    }
}
