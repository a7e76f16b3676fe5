//! Lever axis quantization

/// Raw lever axis range
pub const AXIS_MIN: i32 = -32767;
pub const AXIS_MAX: i32 = 32767;

/// Linear map of `x` from `[in_min, in_max]` onto `[out_min, out_max]`,
/// truncating toward zero. Computed in `i64`; no clamping.
pub fn map_range(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    if in_max == in_min {
        return out_min;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Bucket index of a raw lever value: `clamp(map(raw, ±32767 -> 0..buckets), 0, buckets - 1)`.
///
/// # Examples
///
/// ```
/// use diywheel_shifter::bucket;
///
/// assert_eq!(bucket(-32767, 4), 0);
/// assert_eq!(bucket(0, 4), 2);
/// assert_eq!(bucket(32767, 4), 3);
/// assert_eq!(bucket(0, 3), 1);
/// ```
pub fn bucket(raw: i32, buckets: usize) -> usize {
    if buckets == 0 {
        return 0;
    }
    let top = buckets as i64;
    let mapped = map_range(
        i64::from(raw),
        i64::from(AXIS_MIN),
        i64::from(AXIS_MAX),
        0,
        top,
    );
    mapped.clamp(0, top - 1) as usize
}
