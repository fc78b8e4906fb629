// src/io/codec.rs
//
// Frame codec trait.
//
// A codec is a pair of pure functions between a protocol's raw frame bytes and
// a CanMessage. Stream reassembly lives beside the codec in each driver
// module; the codec only ever sees one complete frame.

use crate::io::{CanMessage, IoError};

/// Trait for CAN frame codecs.
///
/// The associated types define the protocol-specific raw frame formats.
pub trait FrameCodec {
    /// The raw frame type for decoding (e.g., byte slice)
    type RawFrame: ?Sized;

    /// The encoded frame type for transmission
    type EncodedFrame;

    /// Decode one raw frame into a CanMessage.
    ///
    /// Returns `Err(IoError)` if the frame is malformed.
    fn decode(raw: &Self::RawFrame) -> Result<CanMessage, IoError>;

    /// Encode a message for transmission.
    ///
    /// Returns `Err(IoError)` if the message cannot be represented.
    fn encode(msg: &CanMessage) -> Result<Self::EncodedFrame, IoError>;
}
