//! WebSocket wire frames.
//!
//! Every frame is a JSON object discriminated by its `type` field.
//! Inbound frames are validated into [`ClientFrame`] before dispatch;
//! anything that does not match a known tag is rejected.

use serde::{Deserialize, Serialize};

use crate::domain::ChatMessage;

/// Inbound frame failed structural decoding.
#[derive(Debug, thiserror::Error)]
#[error("malformed frame: {0}")]
pub struct FrameError(#[from] serde_json::Error);

/// Client → server frames.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Authenticate this connection with a bearer token.
    Auth {
        /// Bearer token issued by the credential service.
        token: String,
    },
    /// Post a chat message.
    Message {
        /// Message body.
        content: String,
    },
}

impl ClientFrame {
    /// Decodes a JSON text payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the payload is not a JSON object with a
    /// known `type` and the fields that type requires.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Server → client frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Authentication succeeded.
    AuthOk,
    /// Authentication failed; the client may retry.
    AuthFail,
    /// A chat message broadcast to every authenticated connection.
    Message(ChatMessage),
}
