//! Where input sources write their values.

/// Axis and button writer shared by every input source.
///
/// Implementations must tolerate concurrent calls from different threads
/// touching different indices. Out-of-range indices are ignored.
pub trait ControllerSink: Send + Sync {
    fn set_axis(&self, index: usize, value: i32);

    fn set_button(&self, index: usize, pressed: bool);
}

impl<S: ControllerSink + ?Sized> ControllerSink for std::sync::Arc<S> {
    fn set_axis(&self, index: usize, value: i32) {
        (**self).set_axis(index, value);
    }

    fn set_button(&self, index: usize, pressed: bool) {
        (**self).set_button(index, pressed);
    }
}
