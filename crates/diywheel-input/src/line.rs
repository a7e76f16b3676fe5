//! Host line protocol.
//!
//! Each newline-terminated record is a list of comma-separated decimal
//! integers written into a persistent 8-slot buffer:
//!
//! | Slot | Meaning |
//! |---|---|
//! | 0, 1 | shifter lever x, y |
//! | 2..=5 | auxiliary axes |
//! | 6 | sequential up trigger |
//! | 7 | sequential down trigger |

use std::io::BufRead;
use std::time::Duration;

use diywheel_errors::TickResultExt;
use diywheel_shifter::Shifter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sink::ControllerSink;
use crate::stats::ListenerStats;
use crate::{InputError, InputResult};

pub const FIELD_SLOTS: usize = 8;

/// Auxiliary value above which a neutral mirror button is pressed
pub const NEUTRAL_THRESHOLD: i32 = 8192;

/// Button mirroring an auxiliary slot while the shifter is in neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeutralButton {
    pub slot: usize,
    pub button: usize,
}

/// Where the line protocol's slots land on the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineMapping {
    /// Controller axis for each of slots 2..=5
    pub axes: [usize; 4],
    pub sequential_up: usize,
    pub sequential_down: usize,
    pub neutral_buttons: Vec<NeutralButton>,
}

impl Default for LineMapping {
    fn default() -> Self {
        Self {
            axes: [1, 2, 4, 3],
            sequential_up: 9,
            sequential_down: 8,
            neutral_buttons: vec![
                NeutralButton { slot: 3, button: 0 },
                NeutralButton { slot: 4, button: 1 },
                NeutralButton { slot: 5, button: 5 },
                NeutralButton { slot: 2, button: 6 },
            ],
        }
    }
}

impl LineMapping {
    /// Every button this mapping writes.
    pub fn buttons(&self) -> impl Iterator<Item = usize> + '_ {
        [self.sequential_up, self.sequential_down]
            .into_iter()
            .chain(self.neutral_buttons.iter().map(|n| n.button))
    }
}

/// Parse one record into `slots`, left to right.
///
/// Fields past the last slot are ignored. A non-numeric field stops the
/// parse; slots filled before it keep their new values. Returns the number of
/// slots written. Blank lines write nothing.
pub fn parse_record(line: &str, slots: &mut [i32; FIELD_SLOTS]) -> InputResult<usize> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(0);
    }

    let mut written = 0;
    for (slot, (index, field)) in slots.iter_mut().zip(line.split(',').enumerate()) {
        let text = field.trim();
        *slot = text.parse().map_err(|source| InputError::InvalidField {
            index,
            text: text.to_owned(),
            source,
        })?;
        written += 1;
    }
    Ok(written)
}

/// Line protocol state: the slot buffer and the shifter it drives.
#[derive(Debug, Clone)]
pub struct LineProtocol {
    mapping: LineMapping,
    shifter: Shifter,
    slots: [i32; FIELD_SLOTS],
}

impl LineProtocol {
    pub fn new(mapping: LineMapping, shifter: Shifter) -> Self {
        Self {
            mapping,
            shifter,
            slots: [0; FIELD_SLOTS],
        }
    }

    pub fn slots(&self) -> &[i32; FIELD_SLOTS] {
        &self.slots
    }

    pub fn shifter(&self) -> &Shifter {
        &self.shifter
    }

    /// Apply one record and publish the resulting axes and buttons.
    ///
    /// Outputs are published even when the record was cut short, since the
    /// fields before the bad one already landed in the buffer.
    pub fn handle_line<S: ControllerSink + ?Sized>(&mut self, line: &str, sink: &S) -> InputResult<usize> {
        let parsed = parse_record(line, &mut self.slots);
        self.publish(sink);
        parsed
    }

    fn publish<S: ControllerSink + ?Sized>(&mut self, sink: &S) {
        let [x, y, a0, a1, a2, a3, up, down] = self.slots;

        for (&axis, value) in self.mapping.axes.iter().zip([a0, a1, a2, a3]) {
            sink.set_axis(axis, value);
        }

        let change = self.shifter.update(x, y);
        if let Some(button) = change.release {
            sink.set_button(button, false);
        }
        if let Some(button) = change.press {
            sink.set_button(button, true);
        }

        sink.set_button(self.mapping.sequential_up, up > 0);
        sink.set_button(self.mapping.sequential_down, down > 0);

        let neutral = self.shifter.is_neutral();
        for mirror in &self.mapping.neutral_buttons {
            let value = self.slots.get(mirror.slot).copied().unwrap_or(0);
            sink.set_button(mirror.button, neutral && value > NEUTRAL_THRESHOLD);
        }
    }
}

/// Blocking reader loop for the line protocol.
pub struct LineListener {
    protocol: LineProtocol,
    start_delay: Duration,
}

impl LineListener {
    pub fn new(protocol: LineProtocol, start_delay: Duration) -> Self {
        Self {
            protocol,
            start_delay,
        }
    }

    pub fn protocol(&self) -> &LineProtocol {
        &self.protocol
    }

    /// Read records until end of stream or a read error.
    pub fn run<R: BufRead, S: ControllerSink + ?Sized>(&mut self, reader: R, sink: &S) -> ListenerStats {
        if !self.start_delay.is_zero() {
            let delay_ms = u64::try_from(self.start_delay.as_millis()).unwrap_or(u64::MAX);
            debug!(delay_ms, "line listener start delay");
            std::thread::sleep(self.start_delay);
        }
        info!("line listener started");

        let mut stats = ListenerStats::default();
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "line listener read failed");
                    break;
                }
            };
            match self.protocol.handle_line(&line, sink).consume("line record") {
                Some(_) => stats.accepted += 1,
                None => stats.rejected += 1,
            }
        }

        info!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            "line listener finished"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() -> Result<(), Box<dyn std::error::Error>> {
        let mut slots = [0; FIELD_SLOTS];
        let n = parse_record("100,50,1000,2000,3000,4000,1,0", &mut slots)?;
        assert_eq!(n, 8);
        assert_eq!(slots, [100, 50, 1000, 2000, 3000, 4000, 1, 0]);
        Ok(())
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_extra_fields() -> Result<(), Box<dyn std::error::Error>> {
        let mut slots = [0; FIELD_SLOTS];
        let n = parse_record(" 1, -2 ,3,4,5,6,7,8,9,10\r\n", &mut slots)?;
        assert_eq!(n, 8);
        assert_eq!(slots, [1, -2, 3, 4, 5, 6, 7, 8]);
        Ok(())
    }

    #[test]
    fn test_parse_keeps_prefix_before_bad_field() {
        let mut slots = [9; FIELD_SLOTS];
        let err = parse_record("1,2,x,4", &mut slots);
        assert!(matches!(err, Err(InputError::InvalidField { index: 2, .. })));
        assert_eq!(slots, [1, 2, 9, 9, 9, 9, 9, 9]);
    }

    #[test]
    fn test_parse_bad_first_field_changes_nothing() {
        let mut slots = [5; FIELD_SLOTS];
        assert!(parse_record("abc,1,2", &mut slots).is_err());
        assert_eq!(slots, [5; FIELD_SLOTS]);
    }

    #[test]
    fn test_parse_short_record_leaves_tail() -> Result<(), Box<dyn std::error::Error>> {
        let mut slots = [7; FIELD_SLOTS];
        assert_eq!(parse_record("1,2", &mut slots)?, 2);
        assert_eq!(slots, [1, 2, 7, 7, 7, 7, 7, 7]);
        assert_eq!(parse_record("", &mut slots)?, 0);
        Ok(())
    }

    #[test]
    fn test_mapping_buttons() {
        let buttons: Vec<_> = LineMapping::default().buttons().collect();
        assert_eq!(buttons, vec![9, 8, 0, 1, 5, 6]);
    }
}
