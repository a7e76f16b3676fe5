//! Motor link for the DIY wheel: a request/reply client for a servo driver
//! reached over a CAN bus.
//!
//! The control loop only sees the [`MotorLink`] contract:
//! - [`MotorLink::setup`]: one-time handshake, fatal on failure
//! - [`MotorLink::get_state`]: one bounded read of angle, velocity and current
//! - [`MotorLink::output`]: one bounded torque write
//!
//! [`CanMotorLink`] implements it over any [`CanBus`]. The binary uses
//! [`UdpGatewayBus`], which tunnels frames to a CAN gateway as fixed-size
//! datagrams.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]

pub mod bus;
pub mod client;
pub mod error;
pub mod frame;
pub mod gateway;
pub mod state;

pub use bus::CanBus;
pub use client::{CanMotorLink, LinkPhase, MotorLink};
pub use error::{MotorLinkError, MotorLinkResult};
pub use frame::{
    CMD_CLEAR_FAULTS, CMD_MOTOR_RUN, CMD_READ_STATE, CMD_TORQUE, CanFrame, MAX_PAYLOAD,
    command_id, reply_id,
};
pub use gateway::{DATAGRAM_LEN, UdpGatewayBus, decode_datagram, encode_datagram};
pub use state::{COUNTS_PER_REVOLUTION, MotorState};
