//! Per-client connection entity and its authentication state machine.
//!
//! A [`Connection`] starts `Unauthenticated`, moves to `Authenticated` at
//! most once, and is closed by consuming it with [`Connection::close`].
//! Once closed it can no longer process frames.
//!
//! The outbound queue is bounded. A peer that stops reading fills it, and
//! a full queue is treated like a gone transport: the sender gets a
//! [`TransportError`] and the registry evicts the connection.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Notify, mpsc};

use super::{ConnectionId, SubjectId};

/// An encoded item queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A JSON text frame, encoded once and shared between recipients.
    Frame(Arc<str>),
    /// Close the transport with the given close code and reason.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

/// Frames a connection may have queued before it counts as stalled.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Sending half of a connection's outbound queue.
pub type OutboundSender = mpsc::Sender<Outbound>;

/// Receiving half of a connection's outbound queue, owned by its writer.
pub type OutboundReceiver = mpsc::Receiver<Outbound>;

/// The connection cannot take more frames: its transport is gone or its
/// outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection {0} cannot accept frames")]
pub struct TransportError(pub ConnectionId);

/// Failure to queue a frame for a single connection.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// Nothing was queued because the connection cannot take frames.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Nothing was queued because the frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Authentication state of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No successful auth frame yet; chat frames are dropped.
    Unauthenticated,
    /// Bound to a subject; eligible for broadcast.
    Authenticated(SubjectId),
}

/// One client's connection: identity, auth state, and outbound queue.
///
/// Mutated only by the protocol handler that owns it.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    state: AuthState,
    outbound: OutboundSender,
    evicted: Arc<Notify>,
}

impl Connection {
    /// Creates an unauthenticated connection with a fresh id.
    #[must_use]
    pub fn new(outbound: OutboundSender) -> Self {
        Self {
            id: ConnectionId::new(),
            state: AuthState::Unauthenticated,
            outbound,
            evicted: Arc::new(Notify::new()),
        }
    }

    /// Creates a connection together with its outbound receiver, using
    /// [`DEFAULT_OUTBOUND_CAPACITY`].
    #[must_use]
    pub fn channel() -> (Self, OutboundReceiver) {
        Self::with_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Creates a connection whose outbound queue holds at most `capacity`
    /// frames (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Returns the connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current authentication state.
    #[must_use]
    pub const fn state(&self) -> &AuthState {
        &self.state
    }

    /// Returns the bound subject, if authenticated.
    #[must_use]
    pub const fn subject(&self) -> Option<&SubjectId> {
        match &self.state {
            AuthState::Authenticated(subject) => Some(subject),
            AuthState::Unauthenticated => None,
        }
    }

    /// Returns `true` once a subject is bound.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    /// Binds `subject` to this connection.
    ///
    /// Returns `false` and leaves the state untouched when the connection
    /// is already authenticated.
    pub fn authenticate(&mut self, subject: SubjectId) -> bool {
        if self.is_authenticated() {
            return false;
        }
        self.state = AuthState::Authenticated(subject);
        true
    }

    /// Returns a handle to the outbound queue for the registry.
    #[must_use]
    pub fn outbound(&self) -> OutboundSender {
        self.outbound.clone()
    }

    /// Returns the signal the registry fires when it evicts this
    /// connection.
    #[must_use]
    pub fn eviction_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.evicted)
    }

    /// Encodes `frame` as JSON and queues it for this connection only.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Encode`] if `frame` cannot be encoded and
    /// [`SendError::Transport`] if the writer side has gone away or the
    /// queue is full.
    pub fn send<T: Serialize>(&self, frame: &T) -> Result<(), SendError> {
        let json = serde_json::to_string(frame)?;
        self.outbound
            .try_send(Outbound::Frame(Arc::from(json)))
            .map_err(|_| TransportError(self.id))?;
        Ok(())
    }

    /// Queues a close instruction for the writer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the writer side has gone away or the
    /// queue is full.
    pub fn send_close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        self.outbound
            .try_send(Outbound::Close {
                code,
                reason: reason.to_string(),
            })
            .map_err(|_| TransportError(self.id))
    }

    /// Returns `true` if the writer side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Resolves once the writer side has gone away.
    pub async fn closed(&self) {
        self.outbound.closed().await;
    }

    /// Terminal transition. Consumes the connection and returns its id so
    /// the caller can unregister it.
    #[must_use]
    pub fn close(self) -> ConnectionId {
        self.id
    }
}
