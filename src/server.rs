//! Server wiring: router composition and the accept loop.
//!
//! Each accepted WebSocket gets its own task running
//! [`crate::ws::connection::run_connection`], which registers the
//! connection, drives its protocol handler, and unregisters it on exit.

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the full application router: REST, WebSocket, and (with the
/// `swagger-ui` feature) the interactive API docs.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let router = Router::new()
        .merge(api::build_router(request_timeout))
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the application on an already bound listener until the
/// process is stopped.
///
/// # Errors
///
/// Returns an I/O error if the accept loop fails.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    request_timeout: Duration,
) -> std::io::Result<()> {
    let app = build_app(state, request_timeout);
    axum::serve(listener, app).await
}
