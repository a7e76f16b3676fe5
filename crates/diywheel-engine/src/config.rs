//! Wheel configuration, loaded from JSON.
//!
//! Every section defaults to the stock wheel, so an empty object `{}` is a
//! complete configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use diywheel_input::{
    AccessoryMap, DEFAULT_MARKER, FrameDecoder, FrameListener, LineListener, LineMapping,
    LineProtocol, MASK_BITS, Pedal, PedalSet,
};
use diywheel_scheduler::DEFAULT_PERIOD_MS;
use diywheel_shifter::{DEFAULT_BUTTON_BASE, ShiftTable, Shifter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::control::{DEFAULT_LOCK_TO_LOCK_DEG, DEFAULT_SOFT_START_TICKS, LoopSettings, max_angle};
use crate::controller::{AXIS_COUNT, BUTTON_COUNT};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    pub wheel: WheelSection,
    pub motor: MotorSection,
    pub shifter: ShifterSection,
    pub line: LineSection,
    pub accessory: AccessorySection,
    /// Analog pedals sampled by the control loop
    pub pedals: Vec<Pedal>,
}

/// Steering geometry and loop timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelSection {
    /// Total rotation between end stops, in degrees
    pub lock_to_lock_deg: u32,
    pub period_ms: u64,
    /// Ticks with limited output after start; `null` disables
    pub soft_start_ticks: Option<u32>,
    pub angle_axes: Vec<usize>,
    /// Buttons flagging positive and negative overrun
    pub lock_buttons: [usize; 2],
}

impl Default for WheelSection {
    fn default() -> Self {
        let settings = LoopSettings::default();
        Self {
            lock_to_lock_deg: DEFAULT_LOCK_TO_LOCK_DEG,
            period_ms: DEFAULT_PERIOD_MS,
            soft_start_ticks: Some(DEFAULT_SOFT_START_TICKS),
            angle_axes: settings.angle_axes,
            lock_buttons: settings.lock_buttons,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorSection {
    pub node: u8,
    /// Bound on a single request/reply transaction
    pub timeout_ms: u64,
    /// CAN gateway address, `host:port`
    pub gateway: Option<String>,
    /// Local UDP bind address
    pub bind: String,
}

impl Default for MotorSection {
    fn default() -> Self {
        Self {
            node: 1,
            timeout_ms: 2,
            gateway: None,
            bind: "0.0.0.0:0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShifterSection {
    /// Rows are x buckets, columns y buckets
    pub table: ShiftTable,
    pub button_base: usize,
}

impl Default for ShifterSection {
    fn default() -> Self {
        Self {
            table: ShiftTable::default(),
            button_base: DEFAULT_BUTTON_BASE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSection {
    #[serde(flatten)]
    pub mapping: LineMapping,
    pub start_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessorySection {
    pub marker: u8,
    /// Button for each mask bit, lowest bit first
    pub buttons: AccessoryMap,
    /// Serial device carrying accessory frames
    pub device: Option<PathBuf>,
}

impl Default for AccessorySection {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER,
            buttons: AccessoryMap::default(),
            device: None,
        }
    }
}

impl WheelConfig {
    /// Read, parse and validate a configuration file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {path:?}"))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {path:?}"))?;
        info!("Loaded wheel configuration from {:?}", path);
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config file: {path:?}"))?;
        debug!("Saved wheel configuration to {:?}", path);
        Ok(())
    }

    /// Reject values the runtime cannot honour.
    ///
    /// Every axis and button has exactly one writer, so overlapping
    /// assignments between sources are rejected along with out-of-range
    /// indices.
    pub fn validate(&self) -> Result<()> {
        let wheel = &self.wheel;
        if max_angle(wheel.lock_to_lock_deg) < 1 {
            anyhow::bail!("Invalid lock-to-lock: {} deg", wheel.lock_to_lock_deg);
        }
        if wheel.period_ms == 0 {
            anyhow::bail!("Invalid control period: {} ms", wheel.period_ms);
        }

        let motor = &self.motor;
        if !(1..=0x7F).contains(&motor.node) {
            anyhow::bail!("Invalid motor node: {}", motor.node);
        }
        if motor.timeout_ms == 0 {
            anyhow::bail!("Invalid motor timeout: {} ms", motor.timeout_ms);
        }
        if motor.timeout_ms.saturating_mul(2) > wheel.period_ms {
            warn!(
                timeout_ms = motor.timeout_ms,
                period_ms = wheel.period_ms,
                "two motor transactions may not fit in one control period"
            );
        }

        if self.accessory.buttons.buttons().len() > MASK_BITS {
            anyhow::bail!(
                "Accessory map has {} buttons, frames carry {}",
                self.accessory.buttons.buttons().len(),
                MASK_BITS
            );
        }

        for (i, pedal) in self.pedals.iter().enumerate() {
            pedal
                .calibration
                .validate()
                .with_context(|| format!("Invalid calibration for pedal {i}"))?;
        }

        let mut axes = Assignments::new("Axis", AXIS_COUNT);
        for &axis in &wheel.angle_axes {
            axes.claim(axis, "wheel")?;
        }
        for &axis in &self.line.mapping.axes {
            axes.claim(axis, "line")?;
        }
        for pedal in &self.pedals {
            axes.claim(pedal.axis, "pedals")?;
        }

        if self.shifter.button_base >= BUTTON_COUNT {
            anyhow::bail!(
                "Invalid shifter button base: {} (limit {})",
                self.shifter.button_base,
                BUTTON_COUNT
            );
        }

        let mut buttons = Assignments::new("Button", BUTTON_COUNT);
        for &button in &wheel.lock_buttons {
            buttons.claim(button, "wheel")?;
        }
        for button in self.shifter().buttons() {
            buttons.claim(button, "shifter")?;
        }
        for button in self.line.mapping.buttons() {
            buttons.claim(button, "line")?;
        }
        for &button in self.accessory.buttons.buttons() {
            buttons.claim(button, "accessory")?;
        }

        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.wheel.period_ms)
    }

    pub fn motor_timeout(&self) -> Duration {
        Duration::from_millis(self.motor.timeout_ms)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            max_angle: max_angle(self.wheel.lock_to_lock_deg),
            soft_start_ticks: self.wheel.soft_start_ticks,
            angle_axes: self.wheel.angle_axes.clone(),
            lock_buttons: self.wheel.lock_buttons,
        }
    }

    pub fn shifter(&self) -> Shifter {
        Shifter::new(self.shifter.table.clone(), self.shifter.button_base)
    }

    pub fn line_listener(&self) -> LineListener {
        let protocol = LineProtocol::new(self.line.mapping.clone(), self.shifter());
        LineListener::new(protocol, Duration::from_millis(self.line.start_delay_ms))
    }

    pub fn frame_listener(&self) -> FrameListener {
        FrameListener::new(
            FrameDecoder::new(self.accessory.marker),
            self.accessory.buttons.clone(),
        )
    }

    pub fn pedal_set(&self) -> PedalSet {
        PedalSet::new(self.pedals.clone())
    }
}

/// Index ownership across input sources.
struct Assignments {
    what: &'static str,
    limit: usize,
    owners: BTreeMap<usize, &'static str>,
}

impl Assignments {
    fn new(what: &'static str, limit: usize) -> Self {
        Self {
            what,
            limit,
            owners: BTreeMap::new(),
        }
    }

    fn claim(&mut self, index: usize, owner: &'static str) -> Result<()> {
        if index >= self.limit {
            anyhow::bail!(
                "{} {} used by {} is out of range (limit {})",
                self.what,
                index,
                owner,
                self.limit
            );
        }
        if let Some(previous) = self.owners.insert(index, owner) {
            anyhow::bail!(
                "{} {} is assigned to both {} and {}",
                self.what,
                index,
                previous,
                owner
            );
        }
        Ok(())
    }
}
