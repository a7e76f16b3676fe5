//! Pure force functions: conditions, envelopes and periodic waveforms.
//!
//! Everything here is integer math except the sine sample, and none of it
//! touches engine state.

use crate::constants::{DIRECTION_RANGE, MAX_FORCE, MAX_MAGNITUDE, to_force_units};
use crate::effects::{Condition, EffectKind, Envelope};

/// Force of one condition axis against `metric` (output units).
///
/// Zero inside `center_offset ± dead_band`; outside, the distance past the
/// band times the coefficient for that side, limited by that side's
/// saturation.
pub fn condition_force(metric: i64, condition: &Condition) -> i64 {
    let center = to_force_units(condition.center_offset);
    let band = to_force_units(condition.dead_band);
    let lower = center - band;
    let upper = center + band;

    let force = if metric < lower {
        (metric - lower) * i64::from(condition.negative_coefficient) / i64::from(MAX_MAGNITUDE)
    } else if metric > upper {
        (metric - upper) * i64::from(condition.positive_coefficient) / i64::from(MAX_MAGNITUDE)
    } else {
        0
    };

    force.clamp(
        -to_force_units(condition.negative_saturation),
        to_force_units(condition.positive_saturation),
    )
}

/// Friction: a constant force following the sign of `velocity` once it
/// leaves the dead band.
pub fn friction_force(velocity: i64, condition: &Condition) -> i64 {
    let band = to_force_units(condition.dead_band);
    let force = if velocity > band {
        to_force_units(condition.positive_coefficient)
    } else if velocity < -band {
        -to_force_units(condition.negative_coefficient)
    } else {
        0
    };

    force.clamp(
        -to_force_units(condition.negative_saturation),
        to_force_units(condition.positive_saturation),
    )
}

/// Envelope-shaped level for a base magnitude `level` (`0..=10000`).
///
/// During the attack window the level ramps from `attack_level` to `level`;
/// during the fade window before `duration_ms` it ramps from `level` to
/// `fade_level`. Outside both windows the level is unchanged.
pub fn apply_envelope(
    level: i32,
    envelope: &Envelope,
    elapsed_ms: u64,
    duration_ms: Option<u32>,
) -> i32 {
    let level = i64::from(level);
    let attack_time = u64::from(envelope.attack_time_ms);
    if elapsed_ms < attack_time {
        let attack = i64::from(envelope.attack_level);
        let shaped = attack + (level - attack) * elapsed_ms as i64 / attack_time as i64;
        return shaped as i32;
    }

    if let Some(duration) = duration_ms.map(u64::from) {
        let fade_time = u64::from(envelope.fade_time_ms);
        if fade_time > 0 && elapsed_ms <= duration && elapsed_ms + fade_time > duration {
            let fade = i64::from(envelope.fade_level);
            let remaining = (duration - elapsed_ms) as i64;
            let shaped = fade + (level - fade) * remaining / fade_time as i64;
            return shaped as i32;
        }
    }

    level as i32
}

/// Sample of a periodic waveform at `elapsed_ms`, in `-10000..=10000`.
///
/// `phase_deg` shifts the waveform forward by that fraction of a period.
/// Returns 0 for non-periodic kinds or a zero period.
pub fn periodic_sample(kind: EffectKind, elapsed_ms: u64, phase_deg: u16, period_ms: u32) -> i32 {
    if period_ms == 0 {
        return 0;
    }
    let period = i64::from(period_ms);
    let shift = i64::from(phase_deg) * period / i64::from(DIRECTION_RANGE);
    let t = (elapsed_ms as i64 + shift) % period;
    let full = i64::from(MAX_MAGNITUDE);

    let sample = match kind {
        EffectKind::Square => {
            if t < period / 2 {
                full
            } else {
                -full
            }
        }
        EffectKind::Sine => {
            let angle = core::f64::consts::TAU * t as f64 / period as f64;
            (angle.sin() * full as f64).round() as i64
        }
        EffectKind::Triangle => {
            // rises from -full to +full over the first half, then back
            let doubled = t * 2;
            let rising = if doubled < period {
                doubled
            } else {
                2 * period - doubled
            };
            (2 * rising - period) * full / period
        }
        EffectKind::SawtoothUp => (2 * t - period) * full / period,
        EffectKind::SawtoothDown => -(2 * t - period) * full / period,
        _ => 0,
    };
    sample as i32
}

/// Clamp a channel sum to the output range.
#[inline]
pub fn clamp_force(value: i64) -> i32 {
    value.clamp(-i64::from(MAX_FORCE), i64::from(MAX_FORCE)) as i32
}
