//! Process-wide set of live connections.
//!
//! [`ConnectionRegistry`] maps [`ConnectionId`] to the connection's auth
//! state and outbound queue behind a single [`tokio::sync::RwLock`].
//! Membership changes take the write lock; broadcast takes the read lock
//! only long enough to snapshot the authenticated recipients.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, RwLock};

use super::connection::{Connection, Outbound, OutboundSender};
use super::{ConnectionId, SubjectId};

#[derive(Debug)]
struct Entry {
    subject: Option<SubjectId>,
    outbound: OutboundSender,
    evicted: Arc<Notify>,
}

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Recipients the frame was queued for.
    pub delivered: usize,
    /// Recipients whose transport was gone or whose queue was full; they
    /// have been unregistered and told to shut down.
    pub evicted: usize,
}

/// Registry of every accepted connection.
///
/// # Concurrency
///
/// - `register` / `unregister` / `mark_authenticated` are exclusive.
/// - `broadcast` snapshots recipients under a shared lock, then delivers
///   without holding it.
/// - No lock is held across credential checks or persistence calls.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Entry>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection. It is visible to every broadcast started after
    /// this call returns, and receives frames once authenticated.
    pub async fn register(&self, connection: &Connection) {
        let entry = Entry {
            subject: connection.subject().cloned(),
            outbound: connection.outbound(),
            evicted: connection.eviction_signal(),
        };
        let mut map = self.connections.write().await;
        map.insert(connection.id(), entry);
        tracing::debug!(connection_id = %connection.id(), total = map.len(), "connection registered");
    }

    /// Marks a registered connection as authenticated to `subject`.
    ///
    /// Returns `false` if the connection is no longer registered, in
    /// which case the caller must discard the auth result. A connection
    /// that is already authenticated keeps its original subject.
    pub async fn mark_authenticated(&self, id: ConnectionId, subject: SubjectId) -> bool {
        let mut map = self.connections.write().await;
        match map.get_mut(&id) {
            Some(entry) => {
                if entry.subject.is_none() {
                    entry.subject = Some(subject);
                }
                true
            }
            None => false,
        }
    }

    /// Removes a connection. Returns `true` if it was present; a second
    /// call for the same id is a no-op.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut map = self.connections.write().await;
        let removed = map.remove(&id).is_some();
        if removed {
            tracing::debug!(connection_id = %id, total = map.len(), "connection unregistered");
        }
        removed
    }

    /// Queues `frame` for every authenticated connection except `exclude`.
    ///
    /// Delivery failures are isolated: a recipient whose transport is gone
    /// or whose queue is full is skipped, the rest still receive the
    /// frame, and the failed recipients are unregistered afterwards. Each
    /// evicted connection's eviction signal is fired so its task ends.
    pub async fn broadcast<T: Serialize>(
        &self,
        frame: &T,
        exclude: Option<ConnectionId>,
    ) -> BroadcastOutcome {
        let payload: Arc<str> = match serde_json::to_string(frame) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode broadcast frame");
                return BroadcastOutcome::default();
            }
        };

        let recipients: Vec<(ConnectionId, OutboundSender)> = {
            let map = self.connections.read().await;
            map.iter()
                .filter(|(id, entry)| entry.subject.is_some() && Some(**id) != exclude)
                .map(|(id, entry)| (*id, entry.outbound.clone()))
                .collect()
        };

        let mut outcome = BroadcastOutcome::default();
        let mut failed = Vec::new();
        for (id, outbound) in recipients {
            match outbound.try_send(Outbound::Frame(Arc::clone(&payload))) {
                Ok(()) => outcome.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = %id, "outbound queue full");
                    failed.push(id);
                }
                Err(TrySendError::Closed(_)) => failed.push(id),
            }
        }

        if !failed.is_empty() {
            let mut map = self.connections.write().await;
            for id in &failed {
                if let Some(entry) = map.remove(id) {
                    entry.evicted.notify_one();
                    outcome.evicted += 1;
                    tracing::warn!(connection_id = %id, "evicted connection after failed delivery");
                }
            }
        }

        outcome
    }

    /// Returns `true` if the connection is registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Returns the subject bound to a registered connection.
    pub async fn subject_of(&self, id: ConnectionId) -> Option<SubjectId> {
        self.connections
            .read()
            .await
            .get(&id)
            .and_then(|entry| entry.subject.clone())
    }

    /// Returns the number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connections are registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Returns the number of authenticated connections.
    pub async fn authenticated_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|entry| entry.subject.is_some())
            .count()
    }
}
