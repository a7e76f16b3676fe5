//! FFB constants and limits

/// Number of effect blocks the host can allocate
pub const POOL_SIZE: usize = 16;

/// Effects that may play at the same time
pub const MAX_PLAYING: usize = POOL_SIZE;

/// Magnitude, offset and coefficient range accepted from the host
pub const MAX_MAGNITUDE: i32 = 10_000;

/// Saturation, dead band and envelope level range (`0..=MAX_LEVEL`)
pub const MAX_LEVEL: i32 = 10_000;

/// Output range of each force channel
pub const MAX_FORCE: i32 = 32_767;

/// Full-scale gain (effect and device)
pub const MAX_GAIN: u8 = 255;

/// Directions are whole degrees in `0..DIRECTION_RANGE`
pub const DIRECTION_RANGE: u16 = 360;

/// Number of condition axes per effect
pub const CONDITION_AXES: usize = 2;

/// Rescale a host value in `±MAX_MAGNITUDE` to output units.
#[inline]
pub const fn to_force_units(value: i32) -> i64 {
    scale_to_force(value as i64)
}

#[inline]
pub const fn scale_to_force(value: i64) -> i64 {
    value * MAX_FORCE as i64 / MAX_MAGNITUDE as i64
}
