//! Protocol message definitions
//!
//! Defines the JSON messages exchanged between matchmaking clients and the relay.
//! Requests are tagged by a `type` field; error replies carry a bare `error` field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error text sent when an inbound frame is not well-formed JSON
pub const INVALID_JSON: &str = "Invalid JSON";

/// Error text sent when a join targets a missing or full room
pub const ROOM_NOT_FOUND_OR_FULL: &str = "Room not found or full";

// ============================================================================
// Error Types
// ============================================================================

/// Protocol-related errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{INVALID_JSON}: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid JSON: frame is not valid UTF-8")]
    InvalidUtf8,
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

// ============================================================================
// Client Messages
// ============================================================================

/// Room code used when a request carries no `code` field
pub const UNDEFINED_CODE: &str = "undefined";

/// Requests sent from a client to the relay
///
/// Only `type` decides whether a request is recognised. Any `code` value is accepted and
/// turned into a room key by [`room_code_key`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a room under `code`, replacing any room already there
    CreateRoom {
        /// Room code chosen by the client
        #[serde(default = "undefined_code", deserialize_with = "deserialize_room_code")]
        code: String,
    },

    /// Join the waiting room under `code`
    JoinRoom {
        /// Room code to join
        #[serde(default = "undefined_code", deserialize_with = "deserialize_room_code")]
        code: String,
    },
}

fn undefined_code() -> String {
    UNDEFINED_CODE.to_string()
}

fn deserialize_room_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(room_code_key(&value))
}

/// Turn any JSON value into the string key a room is stored under
///
/// Strings are used verbatim. Other values use their script-style string form:
/// `1234` becomes `"1234"`, `null` becomes `"null"`, arrays join their elements with commas.
pub fn room_code_key(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_key(n),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => room_code_key(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_key(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

#[allow(dead_code)]
impl ClientMessage {
    /// Create a CreateRoom message
    pub fn create_room(code: impl Into<String>) -> Self {
        ClientMessage::CreateRoom { code: code.into() }
    }

    /// Create a JoinRoom message
    pub fn join_room(code: impl Into<String>) -> Self {
        ClientMessage::JoinRoom { code: code.into() }
    }
}

/// Decode an inbound text frame
///
/// Returns `Err` only when the payload is not well-formed JSON. Well-formed JSON without a
/// recognised `type` (unknown, missing, or not an object at all) yields `Ok(None)` so the
/// caller can drop it without replying.
pub fn decode_client_message(text: &str) -> ProtocolResult<Option<ClientMessage>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decode an inbound binary frame by treating its payload as UTF-8 text
pub fn decode_client_bytes(data: &[u8]) -> ProtocolResult<Option<ClientMessage>> {
    let text = std::str::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8)?;
    decode_client_message(text)
}

// ============================================================================
// Server Messages
// ============================================================================

/// Room lifecycle notifications, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// Acknowledges a create_room request
    RoomCreated { code: String },
    /// Acknowledges a successful join_room request
    RoomJoined { code: String },
    /// Tells the waiting participant that someone joined
    OpponentJoined { code: String },
}

/// Messages sent from the relay to a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Room lifecycle notification
    Event(RoomEvent),

    /// Error response
    Error {
        /// Human readable error text
        error: String,
    },
}

impl ServerMessage {
    /// Create a room_created message
    pub fn room_created(code: impl Into<String>) -> Self {
        ServerMessage::Event(RoomEvent::RoomCreated { code: code.into() })
    }

    /// Create a room_joined message
    pub fn room_joined(code: impl Into<String>) -> Self {
        ServerMessage::Event(RoomEvent::RoomJoined { code: code.into() })
    }

    /// Create an opponent_joined message
    pub fn opponent_joined(code: impl Into<String>) -> Self {
        ServerMessage::Event(RoomEvent::OpponentJoined { code: code.into() })
    }

    /// Create an Error message
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            error: message.into(),
        }
    }

    /// Create the reply for an undecodable frame
    pub fn invalid_json() -> Self {
        Self::error(INVALID_JSON)
    }

    /// Create the reply for a rejected join
    pub fn room_not_found_or_full() -> Self {
        Self::error(ROOM_NOT_FOUND_OR_FULL)
    }

    /// Serialize the message to JSON
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<ProtocolError> for ServerMessage {
    fn from(_: ProtocolError) -> Self {
        ServerMessage::invalid_json()
    }
}

// ============================================================================
// Tests
// ============================================================================
