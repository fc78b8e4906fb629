// src/io/eth2can/mod.rs
//
// Ethernet-to-CAN adapter driver (UOTEK-style eth2can over TCP).
//
// Every frame on the socket is exactly 13 bytes:
//   [Head-1byte][ArbitrationID-4bytes-BE][Data-8bytes]

mod bus;
pub mod codec;
mod connection;
mod reassembler;

pub use bus::{Eth2CanBus, ADAPTER_NAME, DEFAULT_READ_CHUNK_SIZE};
pub use codec::{encode_padded, Eth2CanCodec};
pub use connection::{Connection, ConnectionState, DEFAULT_CONNECT_TIMEOUT};
pub use reassembler::{FeedOutcome, FrameReassembler, RejectedFrame};
