//! Thread wiring: control loop, line listener, accessory listener.

use std::io::{BufRead, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{Context, Result};
use diywheel_ffb::{EffectEngine, SharedEffectEngine};
use diywheel_input::{AnalogSource, FrameListener, LineListener, ListenerStats};
use diywheel_motor_link::MotorLink;
use diywheel_scheduler::{RunFlag, TickScheduler};
use tracing::{info, warn};

use crate::config::WheelConfig;
use crate::control::{ControlLoop, millis_since};
use crate::controller::{HostInterface, VirtualController};

/// State shared by every thread of one wheel.
pub struct Runtime {
    controller: Arc<VirtualController>,
    effects: SharedEffectEngine,
    epoch: Instant,
    flag: RunFlag,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            controller: Arc::new(VirtualController::new()),
            effects: EffectEngine::new().into_shared(),
            epoch: Instant::now(),
            flag: RunFlag::new(),
        }
    }

    pub fn controller(&self) -> &Arc<VirtualController> {
        &self.controller
    }

    /// Effect engine handle for the host command path.
    pub fn effects(&self) -> &SharedEffectEngine {
        &self.effects
    }

    /// Current time on the effect engine's clock, for `start_effect`.
    pub fn now_ms(&self) -> u64 {
        millis_since(self.epoch)
    }

    pub fn run_flag(&self) -> &RunFlag {
        &self.flag
    }

    /// Ask the control loop to stop after its current tick.
    pub fn stop(&self) {
        self.flag.stop();
    }

    pub fn spawn_line_listener<R>(
        &self,
        mut listener: LineListener,
        reader: R,
    ) -> Result<JoinHandle<ListenerStats>>
    where
        R: BufRead + Send + 'static,
    {
        let controller = Arc::clone(&self.controller);
        thread::Builder::new()
            .name("line-listener".to_string())
            .spawn(move || listener.run(reader, controller.as_ref()))
            .context("Failed to spawn line listener thread")
    }

    pub fn spawn_frame_listener<R>(
        &self,
        mut listener: FrameListener,
        reader: R,
    ) -> Result<JoinHandle<ListenerStats>>
    where
        R: Read + Send + 'static,
    {
        let controller = Arc::clone(&self.controller);
        thread::Builder::new()
            .name("accessory-listener".to_string())
            .spawn(move || listener.run(reader, controller.as_ref()))
            .context("Failed to spawn accessory listener thread")
    }

    /// Configure the motor and start the control loop thread.
    ///
    /// Motor setup runs on the caller's thread; its failure is returned and
    /// no loop is started.
    pub fn start_control<M, H>(
        &self,
        config: &WheelConfig,
        motor: M,
        host: H,
        analog: Option<Box<dyn AnalogSource>>,
    ) -> Result<JoinHandle<()>>
    where
        M: MotorLink + 'static,
        H: HostInterface + 'static,
    {
        let mut control = ControlLoop::new(
            motor,
            host,
            Arc::clone(&self.effects),
            Arc::clone(&self.controller),
            config.loop_settings(),
        )
        .with_epoch(self.epoch);

        match analog {
            Some(analog) => control = control.with_pedals(config.pedal_set(), analog),
            None if !config.pedals.is_empty() => {
                warn!(pedals = config.pedals.len(), "no analog source, pedals disabled");
            }
            None => {}
        }

        control.setup().context("Motor setup failed")?;

        let mut scheduler = TickScheduler::new(config.period()).context("Invalid control period")?;
        let flag = self.flag.clone();
        info!(period = ?config.period(), "starting control loop");
        thread::Builder::new()
            .name("control-loop".to_string())
            .spawn(move || control.run(&mut scheduler, &flag))
            .context("Failed to spawn control loop thread")
    }
}
