//! Bounded in-memory history store.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{HistoryStore, StoreError, StoredMessage};
use crate::domain::ChatMessage;

#[derive(Debug, Default)]
struct Ring {
    messages: VecDeque<StoredMessage>,
    next_id: i64,
}

/// Keeps the newest `retention` messages ordered by `created_at`.
///
/// Appends that arrive slightly out of order (two connections stamping
/// and appending concurrently) are inserted at their sorted position.
/// Ids start at 1 and follow append order, like a `BIGSERIAL` column.
#[derive(Debug)]
pub struct InMemoryHistoryStore {
    ring: RwLock<Ring>,
    retention: usize,
}

impl InMemoryHistoryStore {
    /// Creates a store retaining at most `retention` messages.
    #[must_use]
    pub fn new(retention: usize) -> Self {
        Self {
            ring: RwLock::new(Ring::default()),
            retention: retention.max(1),
        }
    }

    /// Returns the number of retained messages.
    pub async fn len(&self) -> usize {
        self.ring.read().await.messages.len()
    }

    /// Returns `true` if nothing is retained.
    pub async fn is_empty(&self) -> bool {
        self.ring.read().await.messages.is_empty()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut ring = self.ring.write().await;
        ring.next_id = ring.next_id.saturating_add(1);
        let stored = StoredMessage {
            id: ring.next_id,
            message: message.clone(),
        };
        let pos = ring
            .messages
            .partition_point(|m| m.message.created_at <= message.created_at);
        ring.messages.insert(pos, stored);
        while ring.messages.len() > self.retention {
            ring.messages.pop_front();
        }
        Ok(())
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<StoredMessage>, StoreError> {
        let ring = self.ring.read().await;
        let skip = ring.messages.len().saturating_sub(limit);
        Ok(ring.messages.iter().skip(skip).cloned().collect())
    }
}
