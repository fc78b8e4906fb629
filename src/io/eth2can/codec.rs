// src/io/eth2can/codec.rs
//
// eth2can binary wire codec.
//
// Wire frame format (fixed 13 bytes, both directions):
//   [Head-1byte][ArbitrationID-4bytes-BE][Data-8bytes]
//
// The head byte is the only validity marker: a frame is accepted when
// head <= 0x08. There is no DLC, checksum or delimiter; the data field is
// zero-padded to 8 bytes by the sender.

use crate::io::codec::FrameCodec;
use crate::io::{CanMessage, IoError, CAN_MAX_DLEN};

/// eth2can protocol constants
pub mod constants {
    /// Head byte written on every outbound frame, and the largest accepted inbound
    pub const HEAD: u8 = 0x08;
    /// Header length: head + big-endian arbitration ID
    pub const HEADER_LEN: usize = 1 + 4;
    /// Data field length
    pub const DATA_LEN: usize = 8;
    /// Total wire frame length
    pub const FRAME_LEN: usize = HEADER_LEN + DATA_LEN;
}

use constants::*;

/// Whether a head byte marks a valid wire frame.
pub fn is_valid_head(head: u8) -> bool {
    head <= HEAD
}

/// Reject messages the wire protocol cannot carry.
pub fn validate_message(msg: &CanMessage) -> Result<(), IoError> {
    if msg.data.len() > CAN_MAX_DLEN {
        return Err(IoError::invalid_message(format!(
            "data too long: {} bytes (max {})",
            msg.data.len(),
            CAN_MAX_DLEN
        )));
    }
    if msg.is_extended_id {
        return Err(IoError::invalid_message(format!(
            "extended ID 0x{:X} not supported by eth2can",
            msg.arbitration_id
        )));
    }
    Ok(())
}

/// Encode a message with its data zero-padded to the full 8-byte field.
pub fn encode_padded(msg: &CanMessage) -> Result<[u8; FRAME_LEN], IoError> {
    validate_message(msg)?;

    let mut frame = [0u8; FRAME_LEN];
    frame[0] = HEAD;
    frame[1..HEADER_LEN].copy_from_slice(&msg.arbitration_id.to_be_bytes());
    frame[HEADER_LEN..HEADER_LEN + msg.data.len()].copy_from_slice(&msg.data);
    Ok(frame)
}

/// eth2can binary protocol codec.
pub struct Eth2CanCodec;

impl FrameCodec for Eth2CanCodec {
    /// Raw frame is exactly one 13-byte wire frame
    type RawFrame = [u8];
    /// Encoded frame is header plus the message's own data bytes
    type EncodedFrame = Vec<u8>;

    /// Decode one wire frame.
    ///
    /// The head byte is not checked here; the reassembler filters invalid
    /// frames before decoding. The full 8-byte data field is kept as-is.
    fn decode(raw: &[u8]) -> Result<CanMessage, IoError> {
        if raw.len() != FRAME_LEN {
            return Err(IoError::malformed_frame(raw.len()));
        }

        let mut id = [0u8; 4];
        id.copy_from_slice(&raw[1..HEADER_LEN]);

        Ok(CanMessage {
            arbitration_id: u32::from_be_bytes(id),
            data: raw[HEADER_LEN..FRAME_LEN].to_vec(),
            is_extended_id: false,
            timestamp: 0.0,
        })
    }

    /// Encode a message for transmission.
    ///
    /// Format: `[0x08][ID-4bytes-BE][Data...]`. Data is appended verbatim;
    /// use `encode_padded` for a full 13-byte frame.
    fn encode(msg: &CanMessage) -> Result<Vec<u8>, IoError> {
        validate_message(msg)?;

        let mut buf = Vec::with_capacity(HEADER_LEN + msg.data.len());
        buf.push(HEAD);
        buf.extend_from_slice(&msg.arbitration_id.to_be_bytes());
        buf.extend_from_slice(&msg.data);
        Ok(buf)
    }
}
