//! Motor telemetry snapshot.

/// Encoder counts per mechanical revolution of the wheel shaft.
pub const COUNTS_PER_REVOLUTION: i32 = 32768;

/// One poll of the motor driver, in raw encoder units.
///
/// `angle` is multi-turn and wraps at the driver's range. Produced fresh
/// every tick; nothing keeps history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorState {
    pub angle: i32,
    pub velocity: i32,
    pub current: i32,
}

impl MotorState {
    pub const ZERO: Self = Self {
        angle: 0,
        velocity: 0,
        current: 0,
    };

    pub fn angle_degrees(&self) -> f32 {
        self.angle as f32 * 360.0 / COUNTS_PER_REVOLUTION as f32
    }
}
