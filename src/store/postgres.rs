//! PostgreSQL implementation of the history store.
//!
//! Rows live in `relay_messages`, a table owned by the relay. The signup
//! service's `messages` table keys senders by integer user id; relay
//! subjects may be integers or strings, so `sender_id` is stored as JSONB
//! and read back with its original JSON type.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use super::{HistoryStore, StoreError, StoredMessage};
use crate::domain::{ChatMessage, SubjectId};

const CREATE_MESSAGES: &str = "CREATE TABLE IF NOT EXISTS relay_messages (\
     id BIGSERIAL PRIMARY KEY, \
     sender_id JSONB NOT NULL, \
     content TEXT NOT NULL, \
     created_at TIMESTAMPTZ NOT NULL DEFAULT now())";

const CREATE_MESSAGES_INDEX: &str = "CREATE INDEX IF NOT EXISTS relay_messages_created_at_idx \
     ON relay_messages (created_at)";

const INSERT_MESSAGE: &str =
    "INSERT INTO relay_messages (sender_id, content, created_at) VALUES ($1, $2, $3)";

const SELECT_RECENT: &str = "SELECT id, sender_id, content, created_at FROM relay_messages \
     ORDER BY created_at DESC, id DESC LIMIT $1";

type MessageRow = (i64, Json<SubjectId>, String, DateTime<Utc>);

fn stored_from_row((id, Json(sender_id), content, created_at): MessageRow) -> StoredMessage {
    StoredMessage {
        id,
        message: ChatMessage {
            sender_id,
            content,
            created_at,
        },
    }
}

/// PostgreSQL-backed history store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresHistoryStore {
    pool: PgPool,
}

impl PostgresHistoryStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `relay_messages` table and its index if they do not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError::Database`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_MESSAGES).execute(&self.pool).await?;
        sqlx::query(CREATE_MESSAGES_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn append(&self, message: &ChatMessage) -> Result<(), StoreError> {
        sqlx::query(INSERT_MESSAGE)
            .bind(Json(&message.sender_id))
            .bind(&message.content)
            .bind(message.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<StoredMessage>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = sqlx::query_as::<_, MessageRow>(SELECT_RECENT)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.reverse();
        Ok(rows.into_iter().map(stored_from_row).collect())
    }
}
