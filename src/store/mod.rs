//! Message history storage.
//!
//! [`HistoryStore`] is the persistence seam used by the chat service:
//! append one record, read back the most recent ones. Two backends are
//! provided: PostgreSQL for deployments and an in-memory ring for
//! development and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

pub use memory::InMemoryHistoryStore;
pub use postgres::PostgresHistoryStore;

use crate::domain::ChatMessage;

/// A persisted message with the id the store assigned to it.
///
/// Ids grow in append order; history is still ordered by `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Store-assigned row id.
    pub id: i64,
    /// The message record.
    pub message: ChatMessage,
}

/// History store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Store is not reachable or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only message history.
#[async_trait]
pub trait HistoryStore: Send + Sync + std::fmt::Debug {
    /// Appends one message record.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the record could not be persisted.
    async fn append(&self, message: &ChatMessage) -> Result<(), StoreError>;

    /// Returns up to `limit` most recent messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<StoredMessage>, StoreError>;
}
