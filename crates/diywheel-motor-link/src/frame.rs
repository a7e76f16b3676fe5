//! CAN frames and the driver's command set.
//!
//! Byte 0 of every frame is the command code and replies echo it:
//!
//! | Command | Code | Request | Reply |
//! |---|---|---|---|
//! | Clear faults | `0x9B` | - | echo |
//! | Motor run | `0x88` | - | echo |
//! | Read state | `0x9C` | - | `[cmd, cur_lo, cur_hi, vel_lo, vel_hi, a0, a1, a2]` |
//! | Torque | `0xA1` | `[t_lo, t_hi]` | echo |

use crate::error::{MotorLinkError, MotorLinkResult};
use crate::state::MotorState;

pub const CMD_CLEAR_FAULTS: u8 = 0x9B;
pub const CMD_MOTOR_RUN: u8 = 0x88;
pub const CMD_READ_STATE: u8 = 0x9C;
pub const CMD_TORQUE: u8 = 0xA1;

/// Maximum data bytes in a classic CAN frame.
pub const MAX_PAYLOAD: usize = 8;

const COMMAND_BASE: u16 = 0x140;
const REPLY_BASE: u16 = 0x240;

/// Identifier the host uses to address `node`.
#[inline]
pub const fn command_id(node: u8) -> u16 {
    COMMAND_BASE + node as u16
}

/// Identifier `node` answers from.
#[inline]
pub const fn reply_id(node: u8) -> u16 {
    REPLY_BASE + node as u16
}

/// A standard (11-bit) CAN data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: u16,
    len: u8,
    data: [u8; MAX_PAYLOAD],
}

impl CanFrame {
    /// Build a frame from raw data bytes.
    pub fn new(id: u16, data: &[u8]) -> MotorLinkResult<Self> {
        if data.len() > MAX_PAYLOAD {
            return Err(MotorLinkError::PayloadTooLong(data.len()));
        }
        let mut buf = [0u8; MAX_PAYLOAD];
        if let Some(dst) = buf.get_mut(..data.len()) {
            dst.copy_from_slice(data);
        }
        Ok(Self {
            id: id & 0x7FF,
            len: data.len() as u8,
            data: buf,
        })
    }

    /// Build a command frame: `cmd` followed by `payload`.
    pub fn command(id: u16, cmd: u8, payload: &[u8]) -> MotorLinkResult<Self> {
        let end = payload.len() + 1;
        let mut buf = [0u8; MAX_PAYLOAD];
        buf[0] = cmd;
        buf.get_mut(1..end)
            .ok_or(MotorLinkError::PayloadTooLong(end))?
            .copy_from_slice(payload);
        Self::new(id, buf.get(..end).ok_or(MotorLinkError::PayloadTooLong(end))?)
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        self.data.get(..self.len as usize).unwrap_or(&[])
    }

    /// Command code in byte 0, if the frame carries any data.
    pub fn command_code(&self) -> Option<u8> {
        self.data().first().copied()
    }
}

/// Torque request payload, little-endian.
pub fn torque_payload(torque: i16) -> [u8; 2] {
    torque.to_le_bytes()
}

/// Decode a read-state reply. The angle is a 24-bit two's-complement value.
pub fn decode_state(frame: &CanFrame) -> MotorLinkResult<MotorState> {
    match *frame.data() {
        [_, c0, c1, v0, v1, a0, a1, a2] => {
            let sign = if a2 & 0x80 != 0 { 0xFF } else { 0x00 };
            Ok(MotorState {
                angle: i32::from_le_bytes([a0, a1, a2, sign]),
                velocity: i32::from(i16::from_le_bytes([v0, v1])),
                current: i32::from(i16::from_le_bytes([c0, c1])),
            })
        }
        _ => Err(MotorLinkError::ShortReply {
            command: frame.command_code().unwrap_or(CMD_READ_STATE),
            len: frame.data().len(),
        }),
    }
}
