//! Per-connection protocol state machine.
//!
//! [`ProtocolHandler`] owns one [`Connection`] and processes its decoded
//! frames strictly one at a time. It never touches the transport: replies
//! go through the connection's outbound queue, broadcasts through the
//! [`ChatService`].

use std::sync::Arc;

use super::messages::{ClientFrame, ServerFrame};
use crate::domain::{Connection, ConnectionId, MessageError, SendError};
use crate::service::ChatService;

/// Whether the connection loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep processing frames.
    Continue,
    /// The transport is gone; tear the connection down.
    Close,
}

/// Sequential frame processor for a single connection.
#[derive(Debug)]
pub struct ProtocolHandler {
    connection: Connection,
    service: Arc<ChatService>,
}

impl ProtocolHandler {
    /// Creates a handler for an already registered connection.
    #[must_use]
    pub fn new(connection: Connection, service: Arc<ChatService>) -> Self {
        Self {
            connection,
            service,
        }
    }

    /// Returns the handled connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns `true` once the connection has authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.connection.is_authenticated()
    }

    /// Decodes and handles one text payload. Malformed payloads are
    /// logged and dropped; the connection stays open.
    pub async fn handle_text(&mut self, text: &str) -> Flow {
        match ClientFrame::decode(text) {
            Ok(frame) => self.handle_frame(frame).await,
            Err(e) => {
                tracing::debug!(connection_id = %self.id(), error = %e, "dropping malformed frame");
                Flow::Continue
            }
        }
    }

    /// Handles one decoded frame.
    pub async fn handle_frame(&mut self, frame: ClientFrame) -> Flow {
        match frame {
            ClientFrame::Auth { token } => self.on_auth(&token).await,
            ClientFrame::Message { content } => self.on_message(&content).await,
        }
    }

    /// Consumes the handler, closing its connection.
    #[must_use]
    pub fn close(self) -> ConnectionId {
        self.connection.close()
    }

    fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// Queues a reply for this connection. Only a transport failure ends
    /// the connection; an unencodable frame is logged and skipped.
    fn reply(&self, frame: &ServerFrame) -> Flow {
        match self.connection.send(frame) {
            Ok(()) => Flow::Continue,
            Err(SendError::Transport(e)) => {
                tracing::debug!(connection_id = %self.id(), error = %e, "reply not queued");
                Flow::Close
            }
            Err(SendError::Encode(e)) => {
                tracing::error!(connection_id = %self.id(), error = %e, "failed to encode reply");
                Flow::Continue
            }
        }
    }

    async fn on_auth(&mut self, token: &str) -> Flow {
        if self.connection.is_authenticated() {
            tracing::debug!(connection_id = %self.id(), "ignoring auth frame on authenticated connection");
            return Flow::Continue;
        }

        let result = tokio::select! {
            biased;
            () = self.connection.closed() => {
                tracing::debug!(connection_id = %self.id(), "connection closed during auth check");
                return Flow::Close;
            }
            result = self.service.authenticate(token) => result,
        };

        match result {
            Ok(subject) => {
                // auth_ok is queued before the registry marks the connection,
                // so it precedes every broadcast this connection receives.
                if self.reply(&ServerFrame::AuthOk) == Flow::Close {
                    return Flow::Close;
                }
                if !self
                    .service
                    .registry()
                    .mark_authenticated(self.id(), subject.clone())
                    .await
                {
                    tracing::debug!(connection_id = %self.id(), "discarding auth result for removed connection");
                    return Flow::Close;
                }
                tracing::info!(connection_id = %self.id(), subject = %subject, "connection authenticated");
                self.connection.authenticate(subject);
                Flow::Continue
            }
            Err(e) => {
                tracing::warn!(connection_id = %self.id(), error = %e, "authentication failed");
                self.reply(&ServerFrame::AuthFail)
            }
        }
    }

    async fn on_message(&mut self, content: &str) -> Flow {
        let Some(subject) = self.connection.subject().cloned() else {
            tracing::debug!(connection_id = %self.id(), "dropping message from unauthenticated connection");
            return Flow::Continue;
        };

        if let Err(MessageError::EmptyContent) = self.service.post_message(&subject, content).await {
            tracing::debug!(connection_id = %self.id(), "dropping empty message");
        }

        if self.connection.is_closed() {
            Flow::Close
        } else {
            Flow::Continue
        }
    }
}
