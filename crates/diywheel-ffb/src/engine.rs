//! The effect pool and per-tick force computation.

use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::constants::{
    CONDITION_AXES, DIRECTION_RANGE, MAX_GAIN, MAX_LEVEL, MAX_MAGNITUDE, MAX_PLAYING, POOL_SIZE,
    scale_to_force,
};
use crate::effects::{
    Condition, EffectDefinition, EffectId, EffectKind, EffectParams, Envelope, Periodic,
    validate_magnitude,
};
use crate::error::{EffectError, EffectResult};
use crate::waveform::{
    apply_envelope, clamp_force, condition_force, friction_force, periodic_sample,
};

/// Engine shared between the host command path and the control loop.
///
/// The control loop only ever calls `try_lock` on it.
pub type SharedEffectEngine = Arc<Mutex<EffectEngine>>;

/// Live wheel state fed to condition effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelInput {
    /// Normalized wheel angle, `±32767` at the configured lock
    pub angle: i32,
    pub velocity: i32,
}

/// Two-channel force output, each channel in `±32767`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForceVector(pub [i32; 2]);

impl ForceVector {
    pub const ZERO: Self = Self([0, 0]);

    /// Steering axis channel.
    pub fn primary(&self) -> i32 {
        self.0[0]
    }

    pub fn secondary(&self) -> i32 {
        self.0[1]
    }
}

/// What the device reports to the host at enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub pool_size: usize,
    pub max_playing: usize,
    pub supported_kinds: &'static [EffectKind],
    pub magnitude: RangeInclusive<i32>,
    pub coefficient: RangeInclusive<i32>,
    pub saturation: RangeInclusive<i32>,
    pub gain: RangeInclusive<u8>,
    pub direction_deg: RangeInclusive<u16>,
}

#[derive(Debug, Clone, Copy)]
struct Effect {
    definition: EffectDefinition,
    params: EffectParams,
    envelope: Option<Envelope>,
    active: bool,
    started_at_ms: u64,
}

impl Effect {
    fn new(definition: EffectDefinition) -> Self {
        let params = if definition.kind.is_condition() {
            EffectParams::Condition([Condition::default(); CONDITION_AXES])
        } else {
            EffectParams::Unset
        };
        Self {
            definition,
            params,
            envelope: None,
            active: false,
            started_at_ms: 0,
        }
    }

    fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms)
    }

    fn expired(&self, now_ms: u64) -> bool {
        self.definition
            .duration_ms
            .is_some_and(|d| self.elapsed_ms(now_ms) >= u64::from(d))
    }

    fn shaped(&self, level: i32, elapsed_ms: u64) -> i32 {
        match &self.envelope {
            Some(env) => apply_envelope(level, env, elapsed_ms, self.definition.duration_ms),
            None => level,
        }
    }

    /// Signed host-unit value of a time-based effect before projection.
    fn time_value(&self, elapsed_ms: u64) -> i64 {
        match self.params {
            EffectParams::Constant { magnitude } => {
                i64::from(magnitude.signum()) * i64::from(self.shaped(magnitude.abs(), elapsed_ms))
            }
            EffectParams::Ramp { start, end } => {
                let value = match self.definition.duration_ms {
                    Some(d) if d > 0 => {
                        let t = elapsed_ms.min(u64::from(d)) as i64;
                        i64::from(start) + i64::from(end - start) * t / i64::from(d)
                    }
                    _ => i64::from(start),
                };
                let level = self.shaped(value.unsigned_abs().min(MAX_MAGNITUDE as u64) as i32, elapsed_ms);
                value.signum() * i64::from(level)
            }
            EffectParams::Periodic(p) => {
                let magnitude = i64::from(self.shaped(p.magnitude, elapsed_ms));
                let sample = i64::from(periodic_sample(
                    self.definition.kind,
                    elapsed_ms,
                    p.phase_deg,
                    p.period_ms,
                ));
                i64::from(p.offset) + magnitude * sample / i64::from(MAX_MAGNITUDE)
            }
            EffectParams::Unset | EffectParams::Condition(_) => 0,
        }
    }

    /// Contribution to both channels, before device gain.
    fn contribution(&self, now_ms: u64, input: WheelInput) -> [i64; 2] {
        let gain = i64::from(self.definition.gain);
        let full = i64::from(MAX_GAIN);

        if let EffectParams::Condition(axes) = &self.params {
            // One steering axis: both conditions see the same metric.
            let metric = match self.definition.kind {
                EffectKind::Spring => i64::from(input.angle),
                _ => i64::from(input.velocity),
            };
            let mut out = [0i64; 2];
            for (slot, cond) in out.iter_mut().zip(axes) {
                let force = if self.definition.kind == EffectKind::Friction {
                    friction_force(metric, cond)
                } else {
                    condition_force(metric, cond)
                };
                *slot = force * gain / full;
            }
            return out;
        }

        let value = scale_to_force(self.time_value(self.elapsed_ms(now_ms))) * gain / full;
        let theta = f64::from(self.definition.direction_deg).to_radians();
        [
            (value as f64 * theta.sin()).round() as i64,
            (value as f64 * theta.cos()).round() as i64,
        ]
    }
}

/// Fixed pool of effect blocks plus device-wide gain and enable state.
#[derive(Debug, Clone)]
pub struct EffectEngine {
    slots: [Option<Effect>; POOL_SIZE],
    device_gain: u8,
    actuators_enabled: bool,
}

impl Default for EffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectEngine {
    pub fn new() -> Self {
        Self {
            slots: [None; POOL_SIZE],
            device_gain: MAX_GAIN,
            actuators_enabled: true,
        }
    }

    pub fn into_shared(self) -> SharedEffectEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            pool_size: POOL_SIZE,
            max_playing: MAX_PLAYING,
            supported_kinds: &EffectKind::ALL,
            magnitude: -MAX_MAGNITUDE..=MAX_MAGNITUDE,
            coefficient: -MAX_MAGNITUDE..=MAX_MAGNITUDE,
            saturation: 0..=MAX_LEVEL,
            gain: 0..=MAX_GAIN,
            direction_deg: 0..=DIRECTION_RANGE - 1,
        }
    }

    /// Allocate a block for a new effect. The effect starts stopped.
    pub fn define_effect(&mut self, definition: EffectDefinition) -> EffectResult<EffectId> {
        definition.validate()?;
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(EffectError::PoolFull)?;
        *slot = Some(Effect::new(definition));
        let id = EffectId::new(index as u8 + 1);
        debug!(%id, kind = ?definition.kind, "effect defined");
        Ok(id)
    }

    pub fn set_condition(
        &mut self,
        id: EffectId,
        axis: usize,
        condition: Condition,
    ) -> EffectResult<()> {
        condition.validate()?;
        let effect = self.effect_mut(id)?;
        let EffectParams::Condition(axes) = &mut effect.params else {
            return Err(mismatch(id, effect, "condition"));
        };
        let slot = axes.get_mut(axis).ok_or_else(|| {
            EffectError::out_of_range("axis", axis as i64, 0, CONDITION_AXES as i64 - 1)
        })?;
        *slot = condition;
        Ok(())
    }

    pub fn set_constant_force(&mut self, id: EffectId, magnitude: i32) -> EffectResult<()> {
        validate_magnitude("magnitude", magnitude)?;
        let effect = self.effect_mut(id)?;
        if effect.definition.kind != EffectKind::Constant {
            return Err(mismatch(id, effect, "constant force"));
        }
        effect.params = EffectParams::Constant { magnitude };
        Ok(())
    }

    pub fn set_envelope(&mut self, id: EffectId, envelope: Envelope) -> EffectResult<()> {
        envelope.validate()?;
        let effect = self.effect_mut(id)?;
        if effect.definition.kind.is_condition() {
            return Err(mismatch(id, effect, "envelope"));
        }
        effect.envelope = Some(envelope);
        Ok(())
    }

    pub fn set_periodic(&mut self, id: EffectId, periodic: Periodic) -> EffectResult<()> {
        periodic.validate()?;
        let effect = self.effect_mut(id)?;
        if !effect.definition.kind.is_periodic() {
            return Err(mismatch(id, effect, "periodic"));
        }
        effect.params = EffectParams::Periodic(periodic);
        Ok(())
    }

    pub fn set_ramp(&mut self, id: EffectId, start: i32, end: i32) -> EffectResult<()> {
        validate_magnitude("ramp start", start)?;
        validate_magnitude("ramp end", end)?;
        let effect = self.effect_mut(id)?;
        if effect.definition.kind != EffectKind::Ramp {
            return Err(mismatch(id, effect, "ramp"));
        }
        effect.params = EffectParams::Ramp { start, end };
        Ok(())
    }

    /// Start (or restart) playback; elapsed time counts from `now_ms`.
    pub fn start_effect(&mut self, id: EffectId, now_ms: u64) -> EffectResult<()> {
        let effect = self.effect_mut(id)?;
        effect.active = true;
        effect.started_at_ms = now_ms;
        trace!(%id, now_ms, "effect started");
        Ok(())
    }

    pub fn stop_effect(&mut self, id: EffectId) -> EffectResult<()> {
        self.effect_mut(id)?.active = false;
        trace!(%id, "effect stopped");
        Ok(())
    }

    /// Release the block; the id becomes invalid until reallocated.
    pub fn free_effect(&mut self, id: EffectId) -> EffectResult<()> {
        let slot = self.slot_mut(id)?;
        if slot.take().is_none() {
            return Err(EffectError::InvalidEffectId(id.get()));
        }
        debug!(%id, "effect freed");
        Ok(())
    }

    pub fn stop_all(&mut self) {
        for effect in self.slots.iter_mut().flatten() {
            effect.active = false;
        }
    }

    /// Remove every effect.
    pub fn reset(&mut self) {
        self.slots = [None; POOL_SIZE];
        debug!("effect pool reset");
    }

    pub fn set_device_gain(&mut self, gain: u8) {
        self.device_gain = gain;
    }

    pub fn device_gain(&self) -> u8 {
        self.device_gain
    }

    pub fn set_actuators_enabled(&mut self, enabled: bool) {
        self.actuators_enabled = enabled;
    }

    pub fn actuators_enabled(&self) -> bool {
        self.actuators_enabled
    }

    pub fn is_playing(&self, id: EffectId) -> bool {
        self.effect(id).is_some_and(|e| e.active)
    }

    pub fn defined_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn playing_count(&self) -> usize {
        self.slots.iter().flatten().filter(|e| e.active).count()
    }

    /// Sum every playing effect into a force vector.
    ///
    /// Effects whose duration has elapsed are stopped first and contribute
    /// nothing. Contributions are summed in ascending id order.
    pub fn calc_forces(&mut self, now_ms: u64, input: WheelInput) -> ForceVector {
        let mut sum = [0i64; 2];
        for (index, effect) in self.slots.iter_mut().enumerate() {
            let Some(effect) = effect.as_mut().filter(|e| e.active) else {
                continue;
            };
            if effect.expired(now_ms) {
                effect.active = false;
                trace!(id = index + 1, "effect duration elapsed");
                continue;
            }
            let [primary, secondary] = effect.contribution(now_ms, input);
            sum[0] += primary;
            sum[1] += secondary;
        }

        if !self.actuators_enabled {
            return ForceVector::ZERO;
        }

        let gain = i64::from(self.device_gain);
        let full = i64::from(MAX_GAIN);
        ForceVector([
            clamp_force(sum[0] * gain / full),
            clamp_force(sum[1] * gain / full),
        ])
    }

    fn slot_mut(&mut self, id: EffectId) -> EffectResult<&mut Option<Effect>> {
        usize::from(id.get())
            .checked_sub(1)
            .and_then(|index| self.slots.get_mut(index))
            .ok_or(EffectError::InvalidEffectId(id.get()))
    }

    fn effect_mut(&mut self, id: EffectId) -> EffectResult<&mut Effect> {
        self.slot_mut(id)?
            .as_mut()
            .ok_or(EffectError::InvalidEffectId(id.get()))
    }

    fn effect(&self, id: EffectId) -> Option<&Effect> {
        usize::from(id.get())
            .checked_sub(1)
            .and_then(|index| self.slots.get(index))
            .and_then(Option::as_ref)
    }
}

fn mismatch(id: EffectId, effect: &Effect, parameter: &'static str) -> EffectError {
    EffectError::KindMismatch {
        id: id.get(),
        kind: effect.definition.kind,
        parameter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn input(angle: i32, velocity: i32) -> WheelInput {
        WheelInput { angle, velocity }
    }

    #[test]
    fn test_empty_engine_is_silent() {
        let mut engine = EffectEngine::new();
        assert_eq!(engine.calc_forces(0, input(10_000, 50)), ForceVector::ZERO);
    }

    #[test]
    fn test_ids_are_one_based_and_reused() -> TestResult {
        let mut engine = EffectEngine::new();
        let a = engine.define_effect(EffectDefinition::new(EffectKind::Constant))?;
        let b = engine.define_effect(EffectDefinition::new(EffectKind::Spring))?;
        assert_eq!((a.get(), b.get()), (1, 2));
        engine.free_effect(a)?;
        let c = engine.define_effect(EffectDefinition::new(EffectKind::Sine))?;
        assert_eq!(c, a);
        Ok(())
    }

    #[test]
    fn test_pool_full() -> TestResult {
        let mut engine = EffectEngine::new();
        for _ in 0..POOL_SIZE {
            engine.define_effect(EffectDefinition::new(EffectKind::Constant))?;
        }
        assert_eq!(
            engine.define_effect(EffectDefinition::new(EffectKind::Constant)),
            Err(EffectError::PoolFull)
        );
        Ok(())
    }

    #[test]
    fn test_unknown_ids() {
        let mut engine = EffectEngine::new();
        for raw in [0u8, 1, 17, 255] {
            assert_eq!(
                engine.start_effect(EffectId::new(raw), 0),
                Err(EffectError::InvalidEffectId(raw))
            );
        }
        assert_eq!(
            engine.free_effect(EffectId::new(3)),
            Err(EffectError::InvalidEffectId(3))
        );
    }

    #[test]
    fn test_kind_mismatch() -> TestResult {
        let mut engine = EffectEngine::new();
        let spring = engine.define_effect(EffectDefinition::new(EffectKind::Spring))?;
        let constant = engine.define_effect(EffectDefinition::new(EffectKind::Constant))?;
        assert!(matches!(
            engine.set_constant_force(spring, 100),
            Err(EffectError::KindMismatch { .. })
        ));
        assert!(matches!(
            engine.set_condition(constant, 0, Condition::default()),
            Err(EffectError::KindMismatch { .. })
        ));
        assert!(matches!(
            engine.set_envelope(spring, Envelope::default()),
            Err(EffectError::KindMismatch { .. })
        ));
        assert!(matches!(
            engine.set_ramp(constant, 0, 10),
            Err(EffectError::KindMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_condition_axis_out_of_range() -> TestResult {
        let mut engine = EffectEngine::new();
        let id = engine.define_effect(EffectDefinition::new(EffectKind::Damper))?;
        assert!(matches!(
            engine.set_condition(id, 2, Condition::default()),
            Err(EffectError::ParameterOutOfRange { name: "axis", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_spring_pushes_with_angle() -> TestResult {
        let mut engine = EffectEngine::new();
        let id = engine.define_effect(EffectDefinition::new(EffectKind::Spring))?;
        engine.set_condition(id, 0, Condition::symmetric(5000))?;
        engine.start_effect(id, 0)?;
        let forces = engine.calc_forces(1, input(2000, 0));
        assert_eq!(forces, ForceVector([1000, 0]));
        let forces = engine.calc_forces(2, input(-2000, 0));
        assert_eq!(forces, ForceVector([-1000, 0]));
        Ok(())
    }

    #[test]
    fn test_second_condition_axis_tracks_same_metric() -> TestResult {
        let mut engine = EffectEngine::new();
        let id = engine.define_effect(EffectDefinition::new(EffectKind::Spring))?;
        engine.set_condition(
            id,
            1,
            Condition {
                center_offset: 1000,
                ..Condition::symmetric(10_000)
            },
        )?;
        engine.start_effect(id, 0)?;
        // offset 1000 is 3276 in force units
        assert_eq!(engine.calc_forces(0, input(3276, 0)), ForceVector::ZERO);
        assert_eq!(engine.calc_forces(1, input(0, 0)), ForceVector([0, -3276]));
        Ok(())
    }

    #[test]
    fn test_damper_uses_velocity() -> TestResult {
        let mut engine = EffectEngine::new();
        let id = engine.define_effect(EffectDefinition::new(EffectKind::Damper))?;
        engine.set_condition(id, 0, Condition::symmetric(10_000))?;
        engine.start_effect(id, 0)?;
        assert_eq!(engine.calc_forces(0, input(30_000, 40)).primary(), 40);
        Ok(())
    }

    #[test]
    fn test_direction_projection() -> TestResult {
        let mut engine = EffectEngine::new();
        let id = engine.define_effect(EffectDefinition::new(EffectKind::Constant))?;
        engine.set_constant_force(id, 10_000)?;
        engine.start_effect(id, 0)?;
        // direction 0 lands entirely on the secondary channel
        assert_eq!(engine.calc_forces(0, input(0, 0)), ForceVector([0, 32_767]));
        Ok(())
    }

    #[test]
    fn test_gains_scale_and_clamp() -> TestResult {
        let mut engine = EffectEngine::new();
        for _ in 0..3 {
            let id = engine
                .define_effect(EffectDefinition::new(EffectKind::Constant).with_direction(90))?;
            engine.set_constant_force(id, 10_000)?;
            engine.start_effect(id, 0)?;
        }
        assert_eq!(engine.calc_forces(0, input(0, 0)).primary(), 32_767);

        engine.set_device_gain(0);
        assert_eq!(engine.calc_forces(0, input(0, 0)), ForceVector::ZERO);
        Ok(())
    }

    #[test]
    fn test_duration_self_deactivates() -> TestResult {
        let mut engine = EffectEngine::new();
        let id = engine.define_effect(
            EffectDefinition::new(EffectKind::Constant)
                .with_direction(90)
                .with_duration(100),
        )?;
        engine.set_constant_force(id, 1000)?;
        engine.start_effect(id, 1000)?;
        assert_eq!(engine.calc_forces(1099, input(0, 0)).primary(), 3276);
        assert_eq!(engine.calc_forces(1100, input(0, 0)), ForceVector::ZERO);
        assert!(!engine.is_playing(id));
        Ok(())
    }

    #[test]
    fn test_disabled_actuators_yield_zero() -> TestResult {
        let mut engine = EffectEngine::new();
        let id = engine.define_effect(EffectDefinition::new(EffectKind::Spring))?;
        engine.set_condition(id, 0, Condition::symmetric(10_000))?;
        engine.start_effect(id, 0)?;
        engine.set_actuators_enabled(false);
        assert_eq!(engine.calc_forces(0, input(20_000, 0)), ForceVector::ZERO);
        Ok(())
    }

    #[test]
    fn test_stop_all_and_reset() -> TestResult {
        let mut engine = EffectEngine::new();
        let a = engine.define_effect(EffectDefinition::new(EffectKind::Sine))?;
        let b = engine.define_effect(EffectDefinition::new(EffectKind::Ramp))?;
        engine.start_effect(a, 0)?;
        engine.start_effect(b, 0)?;
        assert_eq!(engine.playing_count(), 2);
        engine.stop_all();
        assert_eq!(engine.playing_count(), 0);
        assert_eq!(engine.defined_count(), 2);
        engine.reset();
        assert_eq!(engine.defined_count(), 0);
        assert_eq!(engine.stop_effect(a), Err(EffectError::InvalidEffectId(1)));
        Ok(())
    }

    #[test]
    fn test_ramp_progresses_over_duration() -> TestResult {
        let mut engine = EffectEngine::new();
        let id = engine.define_effect(
            EffectDefinition::new(EffectKind::Ramp)
                .with_direction(90)
                .with_duration(1000),
        )?;
        engine.set_ramp(id, -10_000, 10_000)?;
        engine.start_effect(id, 0)?;
        assert_eq!(engine.calc_forces(0, input(0, 0)).primary(), -32_767);
        assert_eq!(engine.calc_forces(500, input(0, 0)).primary(), 0);
        Ok(())
    }

    #[test]
    fn test_capabilities() {
        let caps = EffectEngine::new().capabilities();
        assert_eq!(caps.pool_size, 16);
        assert_eq!(caps.magnitude, -10_000..=10_000);
        assert_eq!(caps.saturation, 0..=10_000);
        assert_eq!(caps.direction_deg, 0..=359);
        assert_eq!(caps.supported_kinds.len(), 10);
    }
}
