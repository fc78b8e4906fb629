// src/io/mod.rs
//
// CAN bus transport abstraction and the eth2can adapter driver.

// Core modules
pub mod bus; // CanBus capability trait
pub mod codec; // Frame codec trait
mod error;

// Adapter drivers
pub mod eth2can; // Ethernet-to-CAN TCP driver

pub use bus::CanBus;
pub use codec::FrameCodec;
pub use error::IoError;
pub use eth2can::{Eth2CanBus, Eth2CanCodec, FrameReassembler};

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Shared Types
// ============================================================================

/// Maximum payload of a classic CAN frame
pub const CAN_MAX_DLEN: usize = 8;

/// A unit of bus traffic.
///
/// Inbound messages are built by the codec; outbound messages are supplied by
/// the caller. Messages are moved, never shared, between queues.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanMessage {
    pub arbitration_id: u32,
    /// 0-8 payload bytes
    pub data: Vec<u8>,
    /// Always false for this transport; the wire protocol has no extended flag
    #[serde(default)]
    pub is_extended_id: bool,
    /// Seconds. The adapter supplies no timing, so received messages carry 0.0
    #[serde(default)]
    pub timestamp: f64,
}

impl CanMessage {
    /// Standard-ID message with the given payload and a zero timestamp.
    pub fn new(arbitration_id: u32, data: &[u8]) -> Self {
        Self {
            arbitration_id,
            data: data.to_vec(),
            is_extended_id: false,
            timestamp: 0.0,
        }
    }

    /// Payload length in bytes.
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Display for CanMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self
            .data
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ");
        write!(
            f,
            "Timestamp: {:>15.6}    ID: {:>8x}    {}    DL: {:>2}    {}",
            self.timestamp,
            self.arbitration_id,
            if self.is_extended_id { "X" } else { "S" },
            self.dlc(),
            data
        )
    }
}

/// Acceptance filter rule. Stored and passed through unchanged; this
/// transport never applies filters itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFilter {
    pub can_id: u32,
    pub can_mask: u32,
    /// When set, only messages with a matching extended flag pass
    #[serde(default)]
    pub extended: Option<bool>,
}

impl CanFilter {
    /// Whether `msg` passes this filter.
    pub fn matches(&self, msg: &CanMessage) -> bool {
        if let Some(extended) = self.extended {
            if extended != msg.is_extended_id {
                return false;
            }
        }
        (msg.arbitration_id & self.can_mask) == (self.can_id & self.can_mask)
    }
}
