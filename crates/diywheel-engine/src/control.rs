//! The periodic wheel control loop.
//!
//! Each tick polls the motor, turns its angle into the normalized steering
//! axis, blends the end-stop spring with the effect engine's output, writes
//! torque back, and publishes the controller report. Nothing inside a tick
//! can fail: every error is logged where it happens and the tick degrades
//! to the last known values.

use std::sync::Arc;
use std::time::Instant;

use diywheel_errors::TickResultExt;
use diywheel_ffb::{ForceVector, SharedEffectEngine, WheelInput};
use diywheel_input::{AnalogSource, ControllerSink, PedalSet};
use diywheel_motor_link::{MotorLink, MotorLinkResult, MotorState};
use diywheel_scheduler::{RunFlag, TickScheduler};
use diywheel_shifter::map_range;
use tracing::{debug, info, trace};

use crate::controller::{HostInterface, VirtualController};

/// Normalized full-scale steering value.
pub const AXIS_FULL_SCALE: i64 = 32767;

pub const DEFAULT_LOCK_TO_LOCK_DEG: u32 = 540;

pub const DEFAULT_SOFT_START_TICKS: u32 = 10;

/// Output bound while soft-start is active
pub const SOFT_START_LIMIT: i64 = 1000;

/// Bound on the centering term of the end-stop force
pub const CENTERING_LIMIT: i64 = 500;

pub const VELOCITY_GAIN: i64 = 128;

/// Restoring gain per count beyond full lock
pub const OVERSHOOT_GAIN: i64 = 8;

/// Ticks between debug telemetry lines
pub const TELEMETRY_INTERVAL: u64 = 100;

/// Raw encoder count at which the wheel reaches half of `lock_to_lock_deg`.
///
/// ```
/// use diywheel_engine::control::max_angle;
///
/// assert_eq!(max_angle(540), 24575);
/// assert_eq!(max_angle(900), 40959);
/// ```
pub fn max_angle(lock_to_lock_deg: u32) -> i64 {
    32768 * i64::from(lock_to_lock_deg / 2) / 360 - 1
}

/// Map a raw motor angle onto `±32767` at `±max_angle`. Not clamped:
/// values past full lock come back beyond full scale.
pub fn normalize_angle(raw: i32, max_angle: i64) -> i64 {
    map_range(
        i64::from(raw),
        -max_angle,
        max_angle,
        -AXIS_FULL_SCALE,
        AXIS_FULL_SCALE,
    )
}

pub fn clamp_axis(angle: i64) -> i32 {
    angle.clamp(-AXIS_FULL_SCALE, AXIS_FULL_SCALE) as i32
}

/// Torque command for one tick.
///
/// `angle` is the unclamped normalized angle and `tick` counts from 1.
/// During ticks `1..=soft_start_ticks` the result is held within
/// [`SOFT_START_LIMIT`].
pub fn compute_torque(
    angle: i64,
    velocity: i32,
    effect_force: i32,
    tick: u64,
    soft_start_ticks: Option<u32>,
) -> i16 {
    let mut output = (-angle).clamp(-CENTERING_LIMIT, CENTERING_LIMIT)
        + i64::from(velocity) * VELOCITY_GAIN;

    if angle > AXIS_FULL_SCALE {
        output -= OVERSHOOT_GAIN * (angle - AXIS_FULL_SCALE);
    } else if angle < -AXIS_FULL_SCALE {
        output -= OVERSHOOT_GAIN * (angle + AXIS_FULL_SCALE);
    }

    output -= i64::from(effect_force);

    if let Some(ticks) = soft_start_ticks
        && tick <= u64::from(ticks)
    {
        output = output.clamp(-SOFT_START_LIMIT, SOFT_START_LIMIT);
    }

    output.clamp(i64::from(i16::MIN) + 1, i64::from(i16::MAX)) as i16
}

/// Milliseconds elapsed since `epoch`, the effect engine's time base.
pub fn millis_since(epoch: Instant) -> u64 {
    u64::try_from(epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Fixed per-loop parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    pub max_angle: i64,
    pub soft_start_ticks: Option<u32>,
    /// Axes carrying the clamped steering angle
    pub angle_axes: Vec<usize>,
    /// Buttons set while past positive and negative lock
    pub lock_buttons: [usize; 2],
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_angle: max_angle(DEFAULT_LOCK_TO_LOCK_DEG),
            soft_start_ticks: Some(DEFAULT_SOFT_START_TICKS),
            angle_axes: vec![0, 5],
            lock_buttons: [2, 3],
        }
    }
}

/// What one tick computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub tick: u64,
    pub state: MotorState,
    /// Unclamped normalized angle
    pub angle: i64,
    pub forces: ForceVector,
    pub torque: i16,
}

pub struct ControlLoop<M, H> {
    motor: M,
    host: H,
    effects: SharedEffectEngine,
    controller: Arc<VirtualController>,
    pedals: PedalSet,
    analog: Option<Box<dyn AnalogSource>>,
    settings: LoopSettings,
    tick: u64,
    last_state: MotorState,
    last_forces: ForceVector,
    started: Instant,
}

impl<M: MotorLink, H: HostInterface> ControlLoop<M, H> {
    pub fn new(
        motor: M,
        host: H,
        effects: SharedEffectEngine,
        controller: Arc<VirtualController>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            motor,
            host,
            effects,
            controller,
            pedals: PedalSet::default(),
            analog: None,
            settings,
            tick: 0,
            last_state: MotorState::ZERO,
            last_forces: ForceVector::ZERO,
            started: Instant::now(),
        }
    }

    /// Use `epoch` as time zero for effect playback. Whoever starts effects
    /// must stamp them against the same epoch.
    pub fn with_epoch(mut self, epoch: Instant) -> Self {
        self.started = epoch;
        self
    }

    pub fn epoch(&self) -> Instant {
        self.started
    }

    /// Sample `pedals` from `analog` at the end of every tick.
    pub fn with_pedals(mut self, pedals: PedalSet, analog: Box<dyn AnalogSource>) -> Self {
        self.pedals = pedals;
        self.analog = Some(analog);
        self
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Motor handshake. A failure here is fatal for the runtime.
    pub fn setup(&mut self) -> MotorLinkResult<()> {
        self.motor.setup()?;
        info!("motor link configured");
        Ok(())
    }

    /// Run one control tick.
    pub fn tick(&mut self) -> TickOutcome {
        self.tick += 1;
        let now_ms = millis_since(self.started);

        let state = match self.motor.get_state().consume("motor state") {
            Some(state) => {
                self.last_state = state;
                state
            }
            None => self.last_state,
        };

        let angle = normalize_angle(state.angle, self.settings.max_angle);
        let axis = clamp_axis(angle);

        let forces = match self.effects.try_lock() {
            Some(mut engine) => engine.calc_forces(
                now_ms,
                WheelInput {
                    angle: axis,
                    velocity: state.velocity,
                },
            ),
            None => {
                trace!(tick = self.tick, "effect engine busy, reusing forces");
                self.last_forces
            }
        };
        self.last_forces = forces;

        let torque = compute_torque(
            angle,
            state.velocity,
            forces.primary(),
            self.tick,
            self.settings.soft_start_ticks,
        );
        if self.motor.output(torque).consume("motor torque").is_none() {
            trace!(tick = self.tick, torque, "torque not delivered");
        }

        let [positive_lock, negative_lock] = self.settings.lock_buttons;
        self.controller
            .set_button(positive_lock, angle > AXIS_FULL_SCALE);
        self.controller
            .set_button(negative_lock, angle < -AXIS_FULL_SCALE);
        for &index in &self.settings.angle_axes {
            self.controller.set_axis(index, axis);
        }

        if let Some(analog) = self.analog.as_mut() {
            self.pedals.sample(analog.as_mut(), self.controller.as_ref());
        }
        self.controller.send_state(&mut self.host);

        if self.tick % TELEMETRY_INTERVAL == 0 {
            debug!(
                tick = self.tick,
                velocity = state.velocity,
                current = state.current,
                angle,
                force_primary = forces.primary(),
                force_secondary = forces.secondary(),
                torque,
                "control telemetry"
            );
        }

        TickOutcome {
            tick: self.tick,
            state,
            angle,
            forces,
            torque,
        }
    }

    /// Tick on `scheduler` until `flag` is cleared.
    pub fn run(&mut self, scheduler: &mut TickScheduler, flag: &RunFlag) {
        info!(period = ?scheduler.period(), "control loop started");
        while flag.is_running() {
            let info = scheduler.wait_for_tick();
            if info.skipped > 0 {
                debug!(skipped = info.skipped, "control loop overran, deadlines skipped");
            }
            self.tick();
        }
        let metrics = scheduler.metrics();
        info!(
            ticks = self.tick,
            overruns = metrics.overruns,
            skipped = metrics.skipped,
            "control loop stopped"
        );
    }
}
