//! Accessory button frames.
//!
//! A frame is three bytes `[marker, hi, lo]`. Bit `i` of `hi << 8 | lo`
//! drives the accessory button mapped at position `i`.

use std::io::{ErrorKind, Read};

use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::sink::ControllerSink;
use crate::stats::ListenerStats;

pub const DEFAULT_MARKER: u8 = 0xA5;

/// Buttons a frame mask can carry
pub const MASK_BITS: usize = 16;

const DEFAULT_FIRST_BUTTON: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Idle,
    Marker,
    High(u8),
}

/// Byte-at-a-time frame decoder.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    marker: u8,
    state: DecodeState,
    dropped: u64,
}

impl FrameDecoder {
    pub fn new(marker: u8) -> Self {
        Self {
            marker,
            state: DecodeState::Idle,
            dropped: 0,
        }
    }

    /// Feed one byte; returns the mask when it completes a frame.
    ///
    /// While waiting for a frame start, anything that is not the marker is
    /// dropped.
    pub fn push(&mut self, byte: u8) -> Option<u16> {
        match self.state {
            DecodeState::Idle if byte == self.marker => {
                self.state = DecodeState::Marker;
                None
            }
            DecodeState::Idle => {
                self.dropped += 1;
                trace!(byte, "dropping byte outside frame");
                None
            }
            DecodeState::Marker => {
                self.state = DecodeState::High(byte);
                None
            }
            DecodeState::High(hi) => {
                self.state = DecodeState::Idle;
                Some(u16::from_be_bytes([hi, byte]))
            }
        }
    }

    /// Bytes discarded while hunting for a marker.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

/// Mask bit to accessory button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessoryMap {
    buttons: Vec<usize>,
}

impl AccessoryMap {
    /// Bits beyond [`MASK_BITS`] are never set and are truncated.
    pub fn new(mut buttons: Vec<usize>) -> Self {
        buttons.truncate(MASK_BITS);
        Self { buttons }
    }

    pub fn buttons(&self) -> &[usize] {
        &self.buttons
    }

    /// Write every mapped button from `mask`.
    pub fn apply<S: ControllerSink + ?Sized>(&self, mask: u16, sink: &S) {
        for (bit, &button) in self.buttons.iter().enumerate() {
            let pressed = mask.checked_shr(bit as u32).is_some_and(|m| m & 1 != 0);
            sink.set_button(button, pressed);
        }
    }
}

impl Default for AccessoryMap {
    fn default() -> Self {
        Self::new((DEFAULT_FIRST_BUTTON..DEFAULT_FIRST_BUTTON + MASK_BITS).collect())
    }
}

/// Blocking reader loop for accessory frames.
pub struct FrameListener {
    decoder: FrameDecoder,
    map: AccessoryMap,
}

impl FrameListener {
    pub fn new(decoder: FrameDecoder, map: AccessoryMap) -> Self {
        Self { decoder, map }
    }

    /// Feed a chunk of bytes, applying every completed frame.
    pub fn feed<S: ControllerSink + ?Sized>(&mut self, bytes: &[u8], sink: &S) -> u64 {
        let mut frames = 0;
        for &byte in bytes {
            if let Some(mask) = self.decoder.push(byte) {
                trace!(mask, "accessory frame");
                self.map.apply(mask, sink);
                frames += 1;
            }
        }
        frames
    }

    /// Read until end of stream or a read error.
    pub fn run<R: Read, S: ControllerSink + ?Sized>(&mut self, mut reader: R, sink: &S) -> ListenerStats {
        info!("accessory listener started");
        let mut stats = ListenerStats::default();
        let mut buf = [0u8; 64];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = buf.get(..n).unwrap_or_default();
                    stats.accepted += self.feed(chunk, sink);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "accessory listener read failed");
                    break;
                }
            }
        }
        stats.rejected = self.decoder.dropped();
        info!(
            frames = stats.accepted,
            dropped_bytes = stats.rejected,
            "accessory listener finished"
        );
        stats
    }
}
