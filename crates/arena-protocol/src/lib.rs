//! arena-protocol
//!
//! Wire-level framing for the slot arena.
//!
//! This crate turns the logical arena messages
//! (`arena_core::InputMessage` / `OutputMessage`) plus the connection
//! handshake into newline-terminated JSON lines and back again.
//!
//! - [`wire_types`] : protocol version and framing limits
//! - [`json_codec`] : frame types and their encode/decode functions

pub mod wire_types;
pub mod json_codec;

pub use wire_types::{MAX_LINE_LEN, PROTOCOL_VERSION};

pub use json_codec::{
    ClientFrame,
    Control,
    Handshake,
    ProtocolError,
    ServerFrame,
    decode_client_frame,
    decode_server_frame,
    encode_client_frame,
    encode_server_frame,
};
