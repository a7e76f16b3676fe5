//! Motor link contract and its CAN request/reply implementation.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::bus::CanBus;
use crate::error::{MotorLinkError, MotorLinkResult};
use crate::frame::{
    CMD_CLEAR_FAULTS, CMD_MOTOR_RUN, CMD_READ_STATE, CMD_TORQUE, CanFrame, command_id,
    decode_state, reply_id, torque_payload,
};
use crate::state::MotorState;

/// What the control loop needs from the motor.
pub trait MotorLink: Send {
    /// One-time handshake. Any failure is fatal for the runtime.
    fn setup(&mut self) -> MotorLinkResult<()>;

    /// One bounded read of the motor state.
    fn get_state(&mut self) -> MotorLinkResult<MotorState>;

    /// One bounded torque write.
    fn output(&mut self, torque: i16) -> MotorLinkResult<()>;
}

/// Client lifecycle. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkPhase {
    Unconfigured,
    Configured,
    Operational,
}

/// Motor client addressing a single driver node over a [`CanBus`].
pub struct CanMotorLink<B> {
    bus: B,
    node: u8,
    timeout: Duration,
    phase: LinkPhase,
}

impl<B: CanBus> CanMotorLink<B> {
    /// Create a client for `node` (1..=0x7F).
    pub fn new(bus: B, node: u8, timeout: Duration) -> MotorLinkResult<Self> {
        if !(1..=0x7F).contains(&node) {
            return Err(MotorLinkError::InvalidNode(node));
        }
        Ok(Self {
            bus,
            node,
            timeout,
            phase: LinkPhase::Unconfigured,
        })
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    pub fn node(&self) -> u8 {
        self.node
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Send `cmd` and wait for the matching reply.
    ///
    /// Frames from other identifiers or echoing other commands are skipped.
    fn transact(&mut self, cmd: u8, payload: &[u8]) -> MotorLinkResult<CanFrame> {
        let request = CanFrame::command(command_id(self.node), cmd, payload)?;
        self.bus.transmit(&request)?;

        let expected_id = reply_id(self.node);
        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let Some(frame) = self.bus.receive(remaining)? else {
                break;
            };
            if frame.id() != expected_id {
                trace!(id = frame.id(), "ignoring frame from other node");
                continue;
            }
            if frame.command_code() != Some(cmd) {
                trace!(code = ?frame.command_code(), cmd, "ignoring reply to other command");
                continue;
            }
            return Ok(frame);
        }

        Err(MotorLinkError::Timeout {
            command: cmd,
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn ensure_configured(&self) -> MotorLinkResult<()> {
        if self.phase == LinkPhase::Unconfigured {
            return Err(MotorLinkError::NotConfigured);
        }
        Ok(())
    }

    fn mark_operational(&mut self) {
        if self.phase == LinkPhase::Configured {
            debug!(node = self.node, "motor link operational");
            self.phase = LinkPhase::Operational;
        }
    }

    fn setup_step(&mut self, step: &'static str, cmd: u8) -> MotorLinkResult<CanFrame> {
        self.transact(cmd, &[]).map_err(|source| MotorLinkError::Setup {
            step,
            source: Box::new(source),
        })
    }
}

impl<B: CanBus> MotorLink for CanMotorLink<B> {
    fn setup(&mut self) -> MotorLinkResult<()> {
        if self.phase != LinkPhase::Unconfigured {
            debug!(node = self.node, "motor link already configured");
            return Ok(());
        }

        self.setup_step("clear faults", CMD_CLEAR_FAULTS)?;
        let reply = self.setup_step("read state", CMD_READ_STATE)?;
        let state = decode_state(&reply).map_err(|source| MotorLinkError::Setup {
            step: "read state",
            source: Box::new(source),
        })?;
        self.setup_step("motor run", CMD_MOTOR_RUN)?;

        info!(
            node = self.node,
            angle = state.angle,
            "motor link configured"
        );
        self.phase = LinkPhase::Configured;
        Ok(())
    }

    fn get_state(&mut self) -> MotorLinkResult<MotorState> {
        self.ensure_configured()?;
        let reply = self.transact(CMD_READ_STATE, &[])?;
        let state = decode_state(&reply)?;
        self.mark_operational();
        Ok(state)
    }

    fn output(&mut self, torque: i16) -> MotorLinkResult<()> {
        self.ensure_configured()?;
        self.transact(CMD_TORQUE, &torque_payload(torque))?;
        self.mark_operational();
        Ok(())
    }
}
