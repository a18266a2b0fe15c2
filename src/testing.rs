//! Test doubles for the collaborator traits.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{AuthError, CredentialService};
use crate::domain::{ChatMessage, SubjectId};
use crate::store::{HistoryStore, StoreError, StoredMessage};

/// Accepts a fixed set of tokens.
#[derive(Debug, Default)]
pub(crate) struct StaticCredentials {
    tokens: HashMap<String, SubjectId>,
}

impl StaticCredentials {
    pub(crate) fn new<'a, S: Into<SubjectId>>(
        pairs: impl IntoIterator<Item = (&'a str, S)>,
    ) -> Self {
        Self {
            tokens: pairs
                .into_iter()
                .map(|(token, subject)| (token.to_string(), subject.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl CredentialService for StaticCredentials {
    async fn verify(&self, token: &str) -> Result<SubjectId, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }
}

/// Rejects every operation.
#[derive(Debug, Default)]
pub(crate) struct FailingHistoryStore;

#[async_trait]
impl HistoryStore for FailingHistoryStore {
    async fn append(&self, _message: &ChatMessage) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn fetch_recent(&self, _limit: usize) -> Result<Vec<StoredMessage>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

/// Succeeds, but only after `delay`.
#[derive(Debug)]
pub(crate) struct SlowHistoryStore {
    pub(crate) delay: Duration,
}

#[async_trait]
impl HistoryStore for SlowHistoryStore {
    async fn append(&self, _message: &ChatMessage) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn fetch_recent(&self, _limit: usize) -> Result<Vec<StoredMessage>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}
