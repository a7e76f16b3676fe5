//! Analog pedals sampled by the control loop.

use diywheel_calibration::Calibration;
use diywheel_errors::TickResultExt;
use serde::{Deserialize, Serialize};

use crate::InputResult;
use crate::sink::ControllerSink;

/// Raw analog readings. The converter itself lives outside this crate.
pub trait AnalogSource: Send {
    fn read(&mut self, channel: usize) -> InputResult<i32>;
}

/// One pedal: where it is read from, where it goes, how it is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pedal {
    pub channel: usize,
    pub axis: usize,
    #[serde(flatten)]
    pub calibration: Calibration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PedalSet {
    pedals: Vec<Pedal>,
}

impl PedalSet {
    pub fn new(pedals: Vec<Pedal>) -> Self {
        Self { pedals }
    }

    pub fn is_empty(&self) -> bool {
        self.pedals.is_empty()
    }

    pub fn pedals(&self) -> &[Pedal] {
        &self.pedals
    }

    /// Read and publish every pedal. A failed read leaves that axis as it was.
    pub fn sample<A, S>(&self, source: &mut A, sink: &S)
    where
        A: AnalogSource + ?Sized,
        S: ControllerSink + ?Sized,
    {
        for pedal in &self.pedals {
            if let Some(raw) = source.read(pedal.channel).consume("pedal sample") {
                sink.set_axis(pedal.axis, pedal.calibration.apply(raw));
            }
        }
    }
}
