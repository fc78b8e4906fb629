// src/io/eth2can/reassembler.rs
//
// Rebuilds fixed-length eth2can frames from arbitrary TCP read boundaries.
//
// Bytes are appended to a carry-over buffer and drained in whole 13-byte
// windows. Each window is checked independently by its head byte; there is
// no resynchronisation at other offsets. After every feed the carry-over
// holds fewer than FRAME_LEN bytes.

use hex::ToHex;

use super::codec::constants::FRAME_LEN;
use super::codec::{is_valid_head, Eth2CanCodec};
use crate::io::codec::FrameCodec;
use crate::io::CanMessage;

/// A 13-byte window whose head byte failed the validity check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedFrame {
    /// Window index within the feed call that produced it
    pub index: usize,
    pub bytes: [u8; FRAME_LEN],
}

impl RejectedFrame {
    pub fn head(&self) -> u8 {
        self.bytes[0]
    }
}

/// Result of one `feed` call, in wire order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedOutcome {
    pub messages: Vec<CanMessage>,
    pub rejected: Vec<RejectedFrame>,
}

/// Stateful de-framer owning the carry-over buffer.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    carry: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self {
            carry: Vec::with_capacity(FRAME_LEN * 2),
        }
    }

    /// Append `raw` and decode every complete window now available.
    pub fn feed(&mut self, raw: &[u8]) -> FeedOutcome {
        let mut out = FeedOutcome::default();
        if raw.is_empty() {
            return out;
        }

        self.carry.extend_from_slice(raw);

        let complete = self.carry.len() / FRAME_LEN;
        for (index, window) in self.carry.chunks_exact(FRAME_LEN).enumerate() {
            if is_valid_head(window[0]) {
                tlog_verbose!(
                    "[eth2can] [{}] full eth2can frame: {}",
                    index,
                    window.encode_hex::<String>()
                );
                // chunks_exact guarantees FRAME_LEN, so decode cannot fail
                if let Ok(msg) = Eth2CanCodec::decode(window) {
                    out.messages.push(msg);
                }
            } else {
                tlog!(
                    "[eth2can] [{}] invalid eth2can frame (head 0x{:02X}), check adapter configuration: {}",
                    index,
                    window[0],
                    window.encode_hex::<String>()
                );
                let mut bytes = [0u8; FRAME_LEN];
                bytes.copy_from_slice(window);
                out.rejected.push(RejectedFrame { index, bytes });
            }
        }

        self.carry.drain(..complete * FRAME_LEN);
        out
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> &[u8] {
        &self.carry
    }

    /// Drop any partial frame, e.g. after reconnecting.
    pub fn reset(&mut self) {
        self.carry.clear();
    }
}
