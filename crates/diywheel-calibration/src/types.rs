//! Calibration types

use serde::{Deserialize, Serialize};

use crate::{CalibrationError, CalibrationResult};

/// Top of the calibrated output range
pub const AXIS_FULL_SCALE: i32 = 32767;

/// Static bounds of one analog input.
///
/// # Examples
///
/// ```
/// use diywheel_calibration::Calibration;
///
/// let cal = Calibration::new(57_000, 62_500);
/// assert_eq!(cal.apply(57_000), 0);
/// assert_eq!(cal.apply(62_500), 32_767);
/// assert_eq!(cal.apply(70_000), 32_767);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    pub min: i32,
    pub max: i32,
}

impl Calibration {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// `clamp(32767 * (raw - min) / (max - min), 0, 32767)`; a range with
    /// `max <= min` always yields 0.
    pub fn apply(&self, raw: i32) -> i32 {
        if self.max <= self.min {
            return 0;
        }
        let span = i64::from(self.max) - i64::from(self.min);
        let scaled = i64::from(AXIS_FULL_SCALE) * (i64::from(raw) - i64::from(self.min)) / span;
        scaled.clamp(0, i64::from(AXIS_FULL_SCALE)) as i32
    }

    /// Reject degenerate bounds up front.
    pub fn validate(&self) -> CalibrationResult<()> {
        if self.max <= self.min {
            return Err(CalibrationError::EmptyRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_points() {
        let cal = Calibration::new(57_000, 62_500);
        assert_eq!(cal.apply(57_000), 0);
        assert_eq!(cal.apply(62_500), 32_767);
        assert_eq!(cal.apply(50_000), 0);
        assert_eq!(cal.apply(70_000), 32_767);
    }

    #[test]
    fn test_midpoint() {
        let cal = Calibration::new(0, 1000);
        assert_eq!(cal.apply(500), 16_383);
    }

    #[test]
    fn test_degenerate_range() {
        let cal = Calibration::new(100, 100);
        assert_eq!(cal.apply(150), 0);
        assert!(cal.validate().is_err());
        assert!(Calibration::new(200, 100).validate().is_err());
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        let cal = Calibration::new(i32::MIN, i32::MAX);
        assert_eq!(cal.apply(i32::MIN), 0);
        assert_eq!(cal.apply(i32::MAX), 32_767);
    }

    #[test]
    fn test_serde_shape() -> Result<(), Box<dyn std::error::Error>> {
        let cal: Calibration = serde_json::from_str(r#"{"min":57000,"max":62500}"#)?;
        assert_eq!(cal, Calibration::new(57_000, 62_500));
        Ok(())
    }
}
