//! Client wire protocol
//!
//! JSON text frames over a WebSocket:
//!
//! ```text
//! server -> client   {"type": "state_update", "state": { ...snapshot... }}
//! client -> server   {"button": "a"}
//! ```
//!
//! There is no handshake and no acknowledgment. Client messages without a
//! `button` key are ignored.

use serde::{Deserialize, Serialize};

use crate::button::{Button, UnknownButton};

/// Messages sent from the server to every connected client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a, S: Serialize> {
    /// Full state snapshot, sent once per tick
    StateUpdate { state: &'a S },
}

/// Raw inbound message as sent by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientMessage {
    #[serde(default)]
    pub button: Option<String>,
}

/// Inbound message decode errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    UnknownButton(#[from] UnknownButton),
}

/// Serialize a snapshot as a `state_update` text frame.
pub fn encode_state_update<S: Serialize>(state: &S) -> serde_json::Result<String> {
    serde_json::to_string(&ServerMessage::StateUpdate { state })
}

/// Decode a client text frame into the button it requests.
///
/// Returns `Ok(None)` for well-formed messages that carry no button.
pub fn decode_command(text: &str) -> Result<Option<Button>, ProtocolError> {
    let message: ClientMessage = serde_json::from_str(text)?;
    match message.button {
        Some(name) => Ok(Some(name.parse()?)),
        None => Ok(None),
    }
}
