//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let chat_service = Arc::clone(&state.chat_service);
    let auth_timeout = state.auth_timeout;
    let outbound_capacity = state.outbound_capacity;

    ws.on_upgrade(move |socket| {
        run_connection(socket, chat_service, auth_timeout, outbound_capacity)
    })
}
