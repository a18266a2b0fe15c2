//! chat-relay server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use chat_relay::app_state::AppState;
use chat_relay::auth::JwtCredentialService;
use chat_relay::config::RelayConfig;
use chat_relay::domain::ConnectionRegistry;
use chat_relay::server;
use chat_relay::service::ChatService;
use chat_relay::store::{HistoryStore, InMemoryHistoryStore, PostgresHistoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RelayConfig::from_env().context("loading configuration")?;
    tracing::info!(addr = %config.listen_addr, "starting chat-relay");
    tracing::debug!(?config, "configuration loaded");
    if config.uses_default_secret() {
        tracing::warn!("JWT_SECRET not set; using the development default secret");
    }

    // Build collaborators
    let history = build_history_store(&config).await?;
    let credentials = Arc::new(JwtCredentialService::new(config.jwt_secret.as_bytes()));

    // Build domain + service layer
    let registry = Arc::new(ConnectionRegistry::new());
    let chat_service = Arc::new(ChatService::new(registry, credentials, history));

    // Build application state
    let app_state = AppState {
        chat_service,
        auth_timeout: config.auth_timeout(),
        history_limit: config.history_limit,
        outbound_capacity: config.outbound_queue_capacity,
    };

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    server::serve(
        listener,
        app_state,
        Duration::from_secs(config.request_timeout_secs),
    )
    .await
    .context("serving")?;

    Ok(())
}

/// Connects to PostgreSQL when persistence is enabled, otherwise falls
/// back to the in-memory store.
async fn build_history_store(config: &RelayConfig) -> anyhow::Result<Arc<dyn HistoryStore>> {
    if !config.persistence_enabled {
        tracing::info!(
            retention = config.history_retention,
            "persistence disabled; keeping history in memory"
        );
        return Ok(Arc::new(InMemoryHistoryStore::new(config.history_retention)));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;

    let store = PostgresHistoryStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("creating relay_messages table")?;
    tracing::info!("history persisted to PostgreSQL");
    Ok(Arc::new(store))
}
