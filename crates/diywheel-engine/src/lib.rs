//! Control loop and runtime for the DIY force-feedback wheel.
//!
//! - [`controller`]: the virtual game controller and its host seam
//! - [`control`]: per-tick torque computation and the periodic loop
//! - [`config`]: JSON configuration with cross-source validation
//! - [`runtime`]: thread wiring for the loop and the input listeners

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod control;
pub mod controller;
pub mod runtime;

pub use config::WheelConfig;
pub use control::{ControlLoop, LoopSettings, TickOutcome, compute_torque, normalize_angle};
pub use controller::{
    AXIS_COUNT, BUTTON_COUNT, ControllerReport, HostError, HostInterface, JsonLinesHost,
    TraceHost, VirtualController,
};
pub use runtime::Runtime;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "diywheel=debug,info";
