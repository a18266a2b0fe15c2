//! Message history handler.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{HistoryQuery, MessageDto};
use crate::app_state::AppState;
use crate::config::MAX_HISTORY_LIMIT;
use crate::error::{ErrorResponse, RelayError};

/// `GET /api/messages` — Recent chat history, oldest first.
///
/// # Errors
///
/// Returns [`RelayError::InvalidRequest`] for a malformed or out-of-range
/// `limit` and
/// [`RelayError::Persistence`] if the history store cannot be read.
#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "Messages",
    summary = "Recent messages",
    description = "Returns the most recent chat messages ordered oldest first, used by clients to seed their view before joining the WebSocket.",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Recent messages", body = Vec<MessageDto>),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 500, description = "History store unavailable", body = ErrorResponse),
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<MessageDto>>, RelayError> {
    let Query(query) = query.map_err(|e| RelayError::InvalidRequest(e.body_text()))?;
    let limit = query.limit.unwrap_or(state.history_limit);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(RelayError::InvalidRequest(format!(
            "limit must be between 1 and {MAX_HISTORY_LIMIT}"
        )));
    }

    let messages = state.chat_service.recent_messages(limit).await?;
    Ok(Json(messages.into_iter().map(MessageDto::from).collect()))
}

/// Message routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages))
}
