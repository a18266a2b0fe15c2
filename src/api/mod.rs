//! REST API layer: route handlers, DTOs, and the OpenAPI document.
//!
//! Endpoints are mounted under `/api` (`/api/messages`, `/api/health`).
//! `/api/v1/messages` and `/health` are kept as aliases.

pub mod dto;
pub mod handlers;
pub mod openapi;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::timeout::TimeoutLayer;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
///
/// `request_timeout` bounds every resource request; a request that runs
/// past it is answered with `408 Request Timeout`.
pub fn build_router(request_timeout: Duration) -> Router<AppState> {
    let resources = handlers::routes().layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        request_timeout,
    ));
    Router::new()
        .nest("/api/v1", resources.clone())
        .nest("/api", resources.merge(handlers::system::routes()))
        .merge(handlers::system::routes())
}
