//! FFB effect types and host-supplied parameter blocks

use crate::constants::{DIRECTION_RANGE, MAX_GAIN, MAX_LEVEL, MAX_MAGNITUDE};
use crate::error::{EffectError, EffectResult};

/// Kinds of force feedback effects the engine can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Constant,
    Ramp,
    Square,
    Sine,
    Triangle,
    SawtoothUp,
    SawtoothDown,
    Spring,
    Damper,
    Friction,
}

impl EffectKind {
    pub const ALL: [EffectKind; 10] = [
        EffectKind::Constant,
        EffectKind::Ramp,
        EffectKind::Square,
        EffectKind::Sine,
        EffectKind::Triangle,
        EffectKind::SawtoothUp,
        EffectKind::SawtoothDown,
        EffectKind::Spring,
        EffectKind::Damper,
        EffectKind::Friction,
    ];

    /// Spring, damper and friction read live wheel state.
    pub const fn is_condition(self) -> bool {
        matches!(
            self,
            EffectKind::Spring | EffectKind::Damper | EffectKind::Friction
        )
    }

    pub const fn is_periodic(self) -> bool {
        matches!(
            self,
            EffectKind::Square
                | EffectKind::Sine
                | EffectKind::Triangle
                | EffectKind::SawtoothUp
                | EffectKind::SawtoothDown
        )
    }
}

/// Handle of an allocated effect block. Ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(u8);

impl EffectId {
    /// Wrap a raw id received from the host. Validity is checked on use.
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for EffectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters of a define-effect command.
///
/// # Examples
///
/// ```
/// use diywheel_ffb::{EffectDefinition, EffectKind};
///
/// let def = EffectDefinition::new(EffectKind::Sine)
///     .with_gain(128)
///     .with_direction(90)
///     .with_duration(1000);
///
/// assert_eq!(def.kind, EffectKind::Sine);
/// assert_eq!(def.duration_ms, Some(1000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectDefinition {
    pub kind: EffectKind,
    pub direction_deg: u16,
    pub gain: u8,
    /// `None` plays until stopped
    pub duration_ms: Option<u32>,
}

impl EffectDefinition {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            direction_deg: 0,
            gain: MAX_GAIN,
            duration_ms: None,
        }
    }

    pub fn with_gain(mut self, gain: u8) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_direction(mut self, direction_deg: u16) -> Self {
        self.direction_deg = direction_deg;
        self
    }

    pub fn with_duration(mut self, duration_ms: u32) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub(crate) fn validate(&self) -> EffectResult<()> {
        if self.direction_deg >= DIRECTION_RANGE {
            return Err(EffectError::out_of_range(
                "direction",
                self.direction_deg,
                0,
                i64::from(DIRECTION_RANGE) - 1,
            ));
        }
        Ok(())
    }
}

/// Per-axis parameters of a condition effect.
///
/// Offsets and coefficients are in `±10000`, saturation and dead band in
/// `0..=10000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub center_offset: i32,
    pub positive_coefficient: i32,
    pub negative_coefficient: i32,
    pub positive_saturation: i32,
    pub negative_saturation: i32,
    pub dead_band: i32,
}

impl Default for Condition {
    fn default() -> Self {
        Self {
            center_offset: 0,
            positive_coefficient: 0,
            negative_coefficient: 0,
            positive_saturation: MAX_LEVEL,
            negative_saturation: MAX_LEVEL,
            dead_band: 0,
        }
    }
}

impl Condition {
    /// Symmetric condition with full saturation.
    pub fn symmetric(coefficient: i32) -> Self {
        Self {
            positive_coefficient: coefficient,
            negative_coefficient: coefficient,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> EffectResult<()> {
        check_magnitude("center offset", self.center_offset)?;
        check_magnitude("positive coefficient", self.positive_coefficient)?;
        check_magnitude("negative coefficient", self.negative_coefficient)?;
        check_level("positive saturation", self.positive_saturation)?;
        check_level("negative saturation", self.negative_saturation)?;
        check_level("dead band", self.dead_band)
    }
}

/// Attack/fade shaping for time-based effects. Levels in `0..=10000`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Envelope {
    pub attack_level: i32,
    pub attack_time_ms: u32,
    pub fade_level: i32,
    pub fade_time_ms: u32,
}

impl Envelope {
    pub(crate) fn validate(&self) -> EffectResult<()> {
        check_level("attack level", self.attack_level)?;
        check_level("fade level", self.fade_level)
    }
}

/// Waveform parameters shared by square, sine, triangle and sawtooth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periodic {
    pub magnitude: i32,
    pub offset: i32,
    pub phase_deg: u16,
    pub period_ms: u32,
}

impl Periodic {
    pub(crate) fn validate(&self) -> EffectResult<()> {
        check_level("magnitude", self.magnitude)?;
        check_magnitude("offset", self.offset)?;
        if self.phase_deg >= DIRECTION_RANGE {
            return Err(EffectError::out_of_range(
                "phase",
                self.phase_deg,
                0,
                i64::from(DIRECTION_RANGE) - 1,
            ));
        }
        if self.period_ms == 0 {
            return Err(EffectError::out_of_range(
                "period",
                self.period_ms,
                1,
                i64::from(u32::MAX),
            ));
        }
        Ok(())
    }
}

/// Kind-specific parameters stored in an effect block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectParams {
    /// Nothing set yet; contributes no force
    Unset,
    Constant { magnitude: i32 },
    Ramp { start: i32, end: i32 },
    Periodic(Periodic),
    Condition([Condition; 2]),
}

fn check_magnitude(name: &'static str, value: i32) -> EffectResult<()> {
    if !(-MAX_MAGNITUDE..=MAX_MAGNITUDE).contains(&value) {
        return Err(EffectError::out_of_range(
            name,
            value,
            -i64::from(MAX_MAGNITUDE),
            i64::from(MAX_MAGNITUDE),
        ));
    }
    Ok(())
}

fn check_level(name: &'static str, value: i32) -> EffectResult<()> {
    if !(0..=MAX_LEVEL).contains(&value) {
        return Err(EffectError::out_of_range(
            name,
            value,
            0,
            i64::from(MAX_LEVEL),
        ));
    }
    Ok(())
}

pub(crate) fn validate_magnitude(name: &'static str, value: i32) -> EffectResult<()> {
    check_magnitude(name, value)
}
