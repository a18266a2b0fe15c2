//! Chat service: authenticates connections, persists and broadcasts
//! messages.

use std::sync::Arc;

use crate::auth::{AuthError, CredentialService};
use crate::domain::{
    BroadcastOutcome, ChatMessage, ConnectionRegistry, MessageClock, MessageError, SubjectId,
};
use crate::store::{HistoryStore, StoreError, StoredMessage};
use crate::ws::messages::ServerFrame;

/// Orchestration layer shared by every connection.
///
/// Owns references to the [`ConnectionRegistry`] for fan-out, the
/// [`CredentialService`] for token checks, and the [`HistoryStore`] for
/// persistence. Posting follows: validate → stamp → append (best effort)
/// → broadcast.
#[derive(Debug)]
pub struct ChatService {
    registry: Arc<ConnectionRegistry>,
    credentials: Arc<dyn CredentialService>,
    history: Arc<dyn HistoryStore>,
    clock: MessageClock,
}

impl ChatService {
    /// Creates a new `ChatService`.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        credentials: Arc<dyn CredentialService>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            registry,
            credentials,
            history,
            clock: MessageClock::new(),
        }
    }

    /// Returns a reference to the inner [`ConnectionRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Verifies a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the credential service rejects it.
    pub async fn authenticate(&self, token: &str) -> Result<SubjectId, AuthError> {
        self.credentials.verify(token).await
    }

    /// Posts a message from `sender` to every authenticated connection,
    /// the sender's own connections included.
    ///
    /// The record is appended to history first; a persistence failure is
    /// logged and does not prevent the broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::EmptyContent`] for blank content, in which
    /// case nothing is persisted or broadcast.
    pub async fn post_message(
        &self,
        sender: &SubjectId,
        content: &str,
    ) -> Result<BroadcastOutcome, MessageError> {
        let message = ChatMessage::new(sender.clone(), content, self.clock.now())?;

        if let Err(e) = self.history.append(&message).await {
            tracing::warn!(subject = %sender, error = %e, "failed to persist message");
        }

        let outcome = self
            .registry
            .broadcast(&ServerFrame::Message(message), None)
            .await;
        tracing::debug!(
            subject = %sender,
            delivered = outcome.delivered,
            evicted = outcome.evicted,
            "message broadcast"
        );
        Ok(outcome)
    }

    /// Returns up to `limit` recent messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the history store cannot be read.
    pub async fn recent_messages(
        &self,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        self.history.fetch_recent(limit).await
    }
}
