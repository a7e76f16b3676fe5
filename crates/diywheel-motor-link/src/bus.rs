//! Transport seam between the motor client and the physical bus.

use std::time::Duration;

use crate::error::MotorLinkResult;
use crate::frame::CanFrame;

/// A CAN bus the client can send frames on and wait for frames from.
pub trait CanBus: Send {
    /// Queue one frame for transmission.
    fn transmit(&mut self, frame: &CanFrame) -> MotorLinkResult<()>;

    /// Wait up to `timeout` for the next frame. `Ok(None)` means nothing
    /// arrived in time.
    fn receive(&mut self, timeout: Duration) -> MotorLinkResult<Option<CanFrame>>;
}

impl<B: CanBus + ?Sized> CanBus for Box<B> {
    fn transmit(&mut self, frame: &CanFrame) -> MotorLinkResult<()> {
        (**self).transmit(frame)
    }

    fn receive(&mut self, timeout: Duration) -> MotorLinkResult<Option<CanFrame>> {
        (**self).receive(timeout)
    }
}
