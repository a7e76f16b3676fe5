//! Virtual game controller shared by the control loop and the listeners.
//!
//! Every axis is its own atomic cell and all buttons live in one bit word
//! updated with `fetch_or`/`fetch_and`, so concurrent writers of distinct
//! fields never clobber each other.

use std::io::Write;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use diywheel_errors::{Classify, WheelErrorKind};
use diywheel_input::ControllerSink;
use serde::Serialize;
use thiserror::Error;
use tracing::{trace, warn};

pub const AXIS_COUNT: usize = 8;
pub const BUTTON_COUNT: usize = 40;

/// Consistent-enough copy of the controller fields handed to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerReport {
    pub axes: [i32; AXIS_COUNT],
    pub buttons: u64,
}

impl ControllerReport {
    pub fn button(&self, index: usize) -> bool {
        index < BUTTON_COUNT && self.buttons & (1 << index) != 0
    }

    pub fn axis(&self, index: usize) -> Option<i32> {
        self.axes.get(index).copied()
    }
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Host interface disconnected")]
    Disconnected,

    #[error("Host write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Classify for HostError {
    fn kind(&self) -> WheelErrorKind {
        WheelErrorKind::TransientIo
    }
}

/// Whatever carries the controller report to the host (USB HID in firmware).
pub trait HostInterface: Send {
    fn send_report(&mut self, report: &ControllerReport) -> Result<(), HostError>;
}

impl<H: HostInterface + ?Sized> HostInterface for Box<H> {
    fn send_report(&mut self, report: &ControllerReport) -> Result<(), HostError> {
        (**self).send_report(report)
    }
}

/// Host that only traces each report.
#[derive(Debug, Default)]
pub struct TraceHost;

impl HostInterface for TraceHost {
    fn send_report(&mut self, report: &ControllerReport) -> Result<(), HostError> {
        trace!(axes = ?report.axes, buttons = report.buttons, "controller report");
        Ok(())
    }
}

/// Host writing one JSON object per report.
#[derive(Debug)]
pub struct JsonLinesHost<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesHost<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> HostInterface for JsonLinesHost<W> {
    fn send_report(&mut self, report: &ControllerReport) -> Result<(), HostError> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct VirtualController {
    axes: [AtomicI32; AXIS_COUNT],
    buttons: AtomicU64,
}

impl VirtualController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ControllerReport {
        ControllerReport {
            axes: std::array::from_fn(|i| {
                self.axes
                    .get(i)
                    .map_or(0, |cell| cell.load(Ordering::Relaxed))
            }),
            buttons: self.buttons.load(Ordering::Relaxed),
        }
    }

    /// Snapshot and hand the report to `host`. Host errors are logged only.
    pub fn send_state<H: HostInterface + ?Sized>(&self, host: &mut H) {
        let report = self.snapshot();
        if let Err(e) = host.send_report(&report) {
            warn!(kind = %e.kind(), "controller report dropped: {}", e);
        }
    }
}

impl ControllerSink for VirtualController {
    fn set_axis(&self, index: usize, value: i32) {
        match self.axes.get(index) {
            Some(cell) => cell.store(value, Ordering::Relaxed),
            None => trace!(index, value, "axis index out of range"),
        }
    }

    fn set_button(&self, index: usize, pressed: bool) {
        if index >= BUTTON_COUNT {
            trace!(index, pressed, "button index out of range");
            return;
        }
        let bit = 1u64 << index;
        if pressed {
            self.buttons.fetch_or(bit, Ordering::Relaxed);
        } else {
            self.buttons.fetch_and(!bit, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FailingHost;

    impl HostInterface for FailingHost {
        fn send_report(&mut self, _report: &ControllerReport) -> Result<(), HostError> {
            Err(HostError::Disconnected)
        }
    }

    #[test]
    fn test_axes_and_buttons_land_in_snapshot() {
        let controller = VirtualController::new();
        controller.set_axis(0, 1234);
        controller.set_axis(7, -5);
        controller.set_button(0, true);
        controller.set_button(39, true);

        let report = controller.snapshot();
        assert_eq!(report.axis(0), Some(1234));
        assert_eq!(report.axis(7), Some(-5));
        assert!(report.button(0));
        assert!(report.button(39));
        assert!(!report.button(1));

        controller.set_button(39, false);
        assert!(!controller.snapshot().button(39));
    }

    #[test]
    fn test_out_of_range_indices_are_ignored() {
        let controller = VirtualController::new();
        controller.set_axis(AXIS_COUNT, 99);
        controller.set_button(BUTTON_COUNT, true);
        controller.set_button(63, true);
        assert_eq!(controller.snapshot(), ControllerReport::default());
    }

    #[test]
    fn test_host_error_is_swallowed() {
        let controller = VirtualController::new();
        controller.set_axis(1, 10);
        controller.send_state(&mut FailingHost);
        assert_eq!(controller.snapshot().axis(1), Some(10));
    }

    #[test]
    fn test_json_host_writes_one_line_per_report() -> Result<(), Box<dyn std::error::Error>> {
        let controller = VirtualController::new();
        controller.set_axis(2, -7);
        controller.set_button(3, true);

        let mut host = JsonLinesHost::new(Vec::new());
        controller.send_state(&mut host);
        controller.send_state(&mut host);

        let text = String::from_utf8(host.into_inner())?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines.first().copied(),
            Some(r#"{"axes":[0,0,-7,0,0,0,0,0],"buttons":8}"#)
        );
        Ok(())
    }

    #[test]
    fn test_concurrent_button_writers_do_not_interfere() -> Result<(), Box<dyn std::error::Error>> {
        let controller = Arc::new(VirtualController::new());
        let handles: Vec<_> = (0..8usize)
            .map(|button| {
                let controller = Arc::clone(&controller);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        controller.set_button(button, i % 2 == 0);
                    }
                    controller.set_button(button, true);
                })
            })
            .collect();
        for handle in handles {
            handle.join().map_err(|_panic| "writer thread panicked")?;
        }
        assert_eq!(controller.snapshot().buttons, 0xFF);
        Ok(())
    }
}
