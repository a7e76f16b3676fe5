//! Fixed-period tick scheduling for the wheel control loop.
//!
//! Deadlines are absolute multiples of the period from the start instant, so
//! slow ticks never accumulate drift. When a tick overruns, the deadlines it
//! ran past are skipped rather than queued: the next tick waits for the
//! first future multiple of the period.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use diywheel_scheduler::{RunFlag, TickScheduler};
//!
//! # fn main() -> Result<(), diywheel_scheduler::SchedulerError> {
//! let flag = RunFlag::new();
//! let mut scheduler = TickScheduler::new(Duration::from_millis(10))?;
//! while flag.is_running() {
//!     let tick = scheduler.wait_for_tick();
//!     if tick.index == 100 {
//!         flag.stop();
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(unused_must_use)]

pub mod error;
pub mod run_flag;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use run_flag::RunFlag;
pub use scheduler::{TickInfo, TickMetrics, TickScheduler, skip_missed};

/// Default control period (100 Hz)
pub const DEFAULT_PERIOD_MS: u64 = 10;
