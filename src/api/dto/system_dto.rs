//! System endpoint DTOs.

use serde::Serialize;
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` when the process can answer.
    pub status: String,
    /// Current server time (RFC 3339).
    pub timestamp: String,
    /// Crate version.
    pub version: String,
    /// Registered WebSocket connections.
    pub connections: usize,
    /// Authenticated WebSocket connections.
    pub authenticated: usize,
}
