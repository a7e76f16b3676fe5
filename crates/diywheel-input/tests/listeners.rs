//! End-to-end listener tests against a recording controller sink.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::Duration;

use diywheel_calibration::Calibration;
use diywheel_input::{
    AccessoryMap, AnalogSource, ControllerSink, FrameDecoder, FrameListener, InputError,
    InputResult, LineListener, LineMapping, LineProtocol, ListenerStats, Pedal, PedalSet,
};
use diywheel_shifter::Shifter;
use parking_lot::Mutex;
use proptest::prelude::*;
use tracing_test::traced_test;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Default)]
struct RecordingSink {
    axes: Mutex<BTreeMap<usize, i32>>,
    buttons: Mutex<BTreeMap<usize, bool>>,
    button_writes: Mutex<Vec<(usize, bool)>>,
}

impl RecordingSink {
    fn axis(&self, index: usize) -> Option<i32> {
        self.axes.lock().get(&index).copied()
    }

    fn button(&self, index: usize) -> bool {
        self.buttons.lock().get(&index).copied().unwrap_or(false)
    }

    fn pressed(&self) -> Vec<usize> {
        self.buttons
            .lock()
            .iter()
            .filter_map(|(&b, &p)| p.then_some(b))
            .collect()
    }
}

impl ControllerSink for RecordingSink {
    fn set_axis(&self, index: usize, value: i32) {
        self.axes.lock().insert(index, value);
    }

    fn set_button(&self, index: usize, pressed: bool) {
        self.buttons.lock().insert(index, pressed);
        self.button_writes.lock().push((index, pressed));
    }
}

fn protocol() -> LineProtocol {
    LineProtocol::new(LineMapping::default(), Shifter::default())
}

#[test]
fn full_record_maps_axes_and_sequential_buttons() -> TestResult {
    let sink = RecordingSink::default();
    let mut proto = protocol();
    proto.handle_line("100,50,1000,2000,3000,4000,1,0", &sink)?;

    assert_eq!(sink.axis(1), Some(1000));
    assert_eq!(sink.axis(2), Some(2000));
    assert_eq!(sink.axis(4), Some(3000));
    assert_eq!(sink.axis(3), Some(4000));
    assert!(sink.button(9), "sequential up");
    assert!(!sink.button(8), "sequential down");
    // lever centred: neutral, no gear buttons
    assert!(proto.shifter().is_neutral());
    assert_eq!(sink.pressed(), vec![9]);
    Ok(())
}

#[test]
#[traced_test]
fn bad_first_field_leaves_state_untouched() -> TestResult {
    let sink = RecordingSink::default();
    let mut proto = protocol();
    proto.handle_line("0,0,11,22,33,44,0,0", &sink)?;

    let err = proto.handle_line("abc,1,2", &sink);
    assert!(matches!(err, Err(InputError::InvalidField { index: 0, .. })));
    assert_eq!(proto.slots(), &[0, 0, 11, 22, 33, 44, 0, 0]);
    assert_eq!(sink.axis(1), Some(11));

    // through the listener the failure is logged at debug, not propagated
    let mut listener = LineListener::new(protocol(), Duration::ZERO);
    let stats = listener.run(Cursor::new("abc,1,2\n1,2\n"), &sink);
    assert_eq!(
        stats,
        ListenerStats {
            accepted: 1,
            rejected: 1
        }
    );
    assert!(logs_contain("discarded malformed input"));
    assert!(logs_contain("line listener finished"));
    Ok(())
}

#[test]
fn gear_changes_release_before_press() -> TestResult {
    let sink = RecordingSink::default();
    let mut proto = protocol();
    proto.handle_line("-32767,32767", &sink)?; // gear 1
    assert!(sink.button(10));
    sink.button_writes.lock().clear();

    proto.handle_line("-32767,-32767", &sink)?; // gear 2
    let writes = sink.button_writes.lock().clone();
    let release = writes.iter().position(|&w| w == (10, false));
    let press = writes.iter().position(|&w| w == (11, true));
    assert!(matches!((release, press), (Some(r), Some(p)) if r < p));
    assert!(!sink.button(10));
    assert!(sink.button(11));
    Ok(())
}

#[test]
fn neutral_mirrors_aux_slots_only_in_neutral() -> TestResult {
    let sink = RecordingSink::default();
    let mut proto = protocol();

    // neutral, slots 2..=5 above/below threshold
    proto.handle_line("0,0,9000,100,9000,9000,0,0", &sink)?;
    assert!(!sink.button(0)); // slot 3 = 100
    assert!(sink.button(1)); // slot 4
    assert!(sink.button(5)); // slot 5
    assert!(sink.button(6)); // slot 2

    // in gear every mirror is released
    proto.handle_line("-32767,32767,9000,9000,9000,9000,0,0", &sink)?;
    for b in [0, 1, 5, 6] {
        assert!(!sink.button(b), "button {b} should be released in gear");
    }
    Ok(())
}

#[test]
fn line_listener_honours_start_delay_and_eof() {
    let sink = RecordingSink::default();
    let mut listener = LineListener::new(protocol(), Duration::from_millis(5));
    let stats = listener.run(Cursor::new("1,2,3\n\n"), &sink);
    assert_eq!(stats.accepted, 2);
    assert_eq!(listener.protocol().slots()[2], 3);
}

#[test]
fn accessory_frame_sets_bit_three() {
    let sink = RecordingSink::default();
    let mut listener = FrameListener::new(FrameDecoder::default(), AccessoryMap::default());
    let stats = listener.run(Cursor::new(vec![0xA5, 0x00, 0x08]), &sink);

    assert_eq!(stats.accepted, 1);
    assert_eq!(sink.pressed(), vec![27]);
    // every mapped button is written
    assert_eq!(sink.buttons.lock().len(), 16);
}

#[test]
fn accessory_frames_survive_chunk_boundaries() {
    let sink = RecordingSink::default();
    let mut listener = FrameListener::new(FrameDecoder::default(), AccessoryMap::default());
    assert_eq!(listener.feed(&[0x77, 0xA5], &sink), 0);
    assert_eq!(listener.feed(&[0x80], &sink), 0);
    assert_eq!(listener.feed(&[0x01, 0xA5, 0x00, 0x00], &sink), 1);
    assert_eq!(sink.pressed(), vec![24, 39]);
    assert_eq!(listener.feed(&[0x00], &sink), 1);
    assert!(sink.pressed().is_empty());
}

struct FakeAdc {
    values: BTreeMap<usize, i32>,
}

impl AnalogSource for FakeAdc {
    fn read(&mut self, channel: usize) -> InputResult<i32> {
        self.values.get(&channel).copied().ok_or(InputError::Analog {
            channel,
            reason: "not connected".into(),
        })
    }
}

#[test]
#[traced_test]
fn pedals_are_calibrated_and_failures_logged() {
    let sink = RecordingSink::default();
    let pedals = PedalSet::new(vec![
        Pedal {
            channel: 0,
            axis: 6,
            calibration: Calibration::new(57_000, 62_500),
        },
        Pedal {
            channel: 1,
            axis: 7,
            calibration: Calibration::new(57_000, 62_500),
        },
    ]);
    let mut adc = FakeAdc {
        values: BTreeMap::from([(0, 70_000)]),
    };
    pedals.sample(&mut adc, &sink);
    assert_eq!(sink.axis(6), Some(32_767));
    assert_eq!(sink.axis(7), None);
    assert!(logs_contain("Analog channel 1 read failed"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn arbitrary_lines_never_panic(line in ".{0,120}") {
        let sink = RecordingSink::default();
        let mut proto = protocol();
        match proto.handle_line(&line, &sink) {
            Ok(written) => prop_assert!(written <= 8),
            Err(InputError::InvalidField { index, .. }) => prop_assert!(index < 8),
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        }
        prop_assert!(sink.pressed().iter().filter(|&&b| (10..=17).contains(&b)).count() <= 1);
    }

    #[test]
    fn numeric_records_fill_slots_in_order(fields in prop::collection::vec(any::<i32>(), 1..12)) {
        let sink = RecordingSink::default();
        let mut proto = protocol();
        let line = fields.iter().map(i32::to_string).collect::<Vec<_>>().join(",");
        let written = proto.handle_line(&line, &sink).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(written, fields.len().min(8));
        for (slot, value) in proto.slots().iter().zip(&fields) {
            prop_assert_eq!(slot, value);
        }
    }
}
