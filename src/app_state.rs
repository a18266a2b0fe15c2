//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::service::ChatService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Chat service shared by every connection and REST handler.
    pub chat_service: Arc<ChatService>,
    /// How long a WebSocket may stay unauthenticated (`None` = unbounded).
    pub auth_timeout: Option<Duration>,
    /// Default page size of the history endpoint.
    pub history_limit: usize,
    /// Frames queued per WebSocket before the peer counts as stalled.
    pub outbound_capacity: usize,
}
