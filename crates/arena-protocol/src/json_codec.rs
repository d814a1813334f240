// crates/arena-protocol/src/json_codec.rs

//! Line-delimited JSON codec.
//!
//! Client → server:
//!
//! - `{"type":"hello","session":"<token>"}`: authenticate; must be
//!   the first line of an event connection.
//! - `{"type":"setNickname","session":"<token>","nickname":"Ann"}`:
//!   one-shot nickname bootstrap; the server answers with
//!   `nicknameResult` and closes.
//! - any `InputMessage`, e.g. `{"type":"selectSlot","index":1}`.
//!
//! Server → client:
//!
//! - `{"type":"welcome","protocolVersion":1}`
//! - `{"type":"denied","reason":"..."}` (the connection then closes)
//! - `{"type":"nicknameResult","success":true}`
//! - any `OutputMessage`, e.g. `{"type":"slotReset","index":1}`.
//!
//! Handshake and event frames share the `"type"` discriminator; the
//! decoder peeks at it to decide which enum to decode into.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use arena_core::{InputMessage, OutputMessage, SessionId};

use crate::wire_types::{validate_line_len, MAX_LINE_LEN, PROTOCOL_VERSION};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("line of {len} bytes exceeds the {max} byte limit")]
    LineTooLong { len: usize, max: usize },

    #[error("empty line")]
    EmptyLine,

    #[error("frame has no \"type\" field")]
    MissingType,

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Frames that only appear before a connection is authenticated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Handshake {
    Hello { session: SessionId },
    SetNickname { session: SessionId, nickname: String },
}

impl Handshake {
    const TYPES: [&'static str; 2] = ["hello", "setNickname"];
}

/// Anything a client may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Handshake(Handshake),
    Event(InputMessage),
}

/// Server replies that are not arena events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Control {
    Welcome {
        protocol_version: u32,
    },
    Denied {
        reason: String,
    },
    NicknameResult {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Control {
    const TYPES: [&'static str; 3] = ["welcome", "denied", "nicknameResult"];

    pub fn welcome() -> Self {
        Control::Welcome {
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

/// Anything a server may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Control(Control),
    Event(OutputMessage),
}

impl From<OutputMessage> for ServerFrame {
    fn from(msg: OutputMessage) -> Self {
        ServerFrame::Event(msg)
    }
}

impl From<Control> for ServerFrame {
    fn from(control: Control) -> Self {
        ServerFrame::Control(control)
    }
}

impl fmt::Display for ClientFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Never print the session token.
            ClientFrame::Handshake(Handshake::Hello { .. }) => write!(f, "hello"),
            ClientFrame::Handshake(Handshake::SetNickname { nickname, .. }) => {
                write!(f, "setNickname({})", nickname)
            }
            ClientFrame::Event(msg) => write!(f, "{:?}", msg),
        }
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Parse one line into a JSON object and return it with its `"type"`.
fn parse_line(line: &str) -> Result<(Value, String), ProtocolError> {
    if !validate_line_len(line.len()) {
        return Err(ProtocolError::LineTooLong {
            len: line.len(),
            max: MAX_LINE_LEN,
        });
    }

    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(ProtocolError::EmptyLine);
    }

    let value: Value = serde_json::from_str(line)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?
        .to_string();
    Ok((value, kind))
}

/// Decode a single client line (terminator optional).
pub fn decode_client_frame(line: &str) -> Result<ClientFrame, ProtocolError> {
    let (value, kind) = parse_line(line)?;
    if Handshake::TYPES.contains(&kind.as_str()) {
        Ok(ClientFrame::Handshake(serde_json::from_value(value)?))
    } else {
        Ok(ClientFrame::Event(serde_json::from_value(value)?))
    }
}

/// Decode a single server line (terminator optional).
pub fn decode_server_frame(line: &str) -> Result<ServerFrame, ProtocolError> {
    let (value, kind) = parse_line(line)?;
    if Control::TYPES.contains(&kind.as_str()) {
        Ok(ServerFrame::Control(serde_json::from_value(value)?))
    } else {
        Ok(ServerFrame::Event(serde_json::from_value(value)?))
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn to_line<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

/// Encode a client frame as one `\n`-terminated line.
pub fn encode_client_frame(frame: &ClientFrame) -> Result<String, ProtocolError> {
    match frame {
        ClientFrame::Handshake(handshake) => to_line(handshake),
        ClientFrame::Event(msg) => to_line(msg),
    }
}

/// Encode a server frame as one `\n`-terminated line.
pub fn encode_server_frame(frame: &ServerFrame) -> Result<String, ProtocolError> {
    match frame {
        ServerFrame::Control(control) => to_line(control),
        ServerFrame::Event(msg) => to_line(msg),
    }
}
