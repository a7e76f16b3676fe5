//! UDP transport to a CAN gateway.
//!
//! Each frame travels as one 16-byte datagram:
//! `[id_lo, id_hi, len, 0, data[8], 0, 0, 0, 0]`.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tracing::{debug, trace};

use crate::bus::CanBus;
use crate::error::MotorLinkResult;
use crate::frame::{CanFrame, MAX_PAYLOAD};

pub const DATAGRAM_LEN: usize = 16;

// Zero is rejected by set_read_timeout.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

pub fn encode_datagram(frame: &CanFrame) -> [u8; DATAGRAM_LEN] {
    let mut out = [0u8; DATAGRAM_LEN];
    let [id_lo, id_hi] = frame.id().to_le_bytes();
    out[0] = id_lo;
    out[1] = id_hi;
    out[2] = frame.data().len() as u8;
    if let Some(dst) = out.get_mut(4..4 + frame.data().len()) {
        dst.copy_from_slice(frame.data());
    }
    out
}

/// Decode a gateway datagram. Returns `None` for anything malformed.
pub fn decode_datagram(buf: &[u8]) -> Option<CanFrame> {
    if buf.len() < DATAGRAM_LEN {
        return None;
    }
    let id = u16::from_le_bytes([*buf.first()?, *buf.get(1)?]);
    let len = usize::from(*buf.get(2)?);
    if len > MAX_PAYLOAD {
        return None;
    }
    CanFrame::new(id, buf.get(4..4 + len)?).ok()
}

/// [`CanBus`] over a connected UDP socket.
pub struct UdpGatewayBus {
    socket: UdpSocket,
    gateway: SocketAddr,
}

impl UdpGatewayBus {
    /// Bind `local` and connect to `gateway`.
    pub fn connect(local: impl ToSocketAddrs, gateway: impl ToSocketAddrs) -> MotorLinkResult<Self> {
        let socket = UdpSocket::bind(local)?;
        socket.connect(gateway)?;
        let gateway = socket.peer_addr()?;
        debug!(%gateway, local = ?socket.local_addr().ok(), "CAN gateway socket ready");
        Ok(Self { socket, gateway })
    }

    pub fn gateway(&self) -> SocketAddr {
        self.gateway
    }
}

impl CanBus for UdpGatewayBus {
    fn transmit(&mut self, frame: &CanFrame) -> MotorLinkResult<()> {
        self.socket.send(&encode_datagram(frame))?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> MotorLinkResult<Option<CanFrame>> {
        self.socket
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;
        let mut buf = [0u8; 64];
        match self.socket.recv(&mut buf) {
            Ok(n) => {
                let frame = buf.get(..n).and_then(decode_datagram);
                if frame.is_none() {
                    trace!(len = n, "dropping malformed gateway datagram");
                }
                Ok(frame)
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
