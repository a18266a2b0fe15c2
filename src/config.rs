//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::connection::DEFAULT_OUTBOUND_CAPACITY;

/// Secret used when `JWT_SECRET` is unset. Only suitable for development.
pub const DEFAULT_JWT_SECRET: &str = "default-secret";

/// Largest page the history endpoint will serve.
pub const MAX_HISTORY_LIMIT: usize = 500;

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `LISTEN_ADDR` is set but is not a socket address.
    #[error("invalid LISTEN_ADDR {value:?}: {source}")]
    ListenAddr {
        /// The rejected value.
        value: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// HS256 secret for bearer token verification.
    pub jwt_secret: String,

    /// PostgreSQL connection string.
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Minimum idle connections in the pool.
    pub database_min_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Use PostgreSQL for history; otherwise keep it in memory.
    pub persistence_enabled: bool,

    /// Messages kept by the in-memory history store.
    pub history_retention: usize,

    /// Default page size of `GET /api/messages`.
    pub history_limit: usize,

    /// Seconds a WebSocket may stay unauthenticated (0 = unbounded).
    pub auth_timeout_secs: u64,

    /// REST request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Frames queued per WebSocket before a non-reading peer is evicted.
    pub outbound_queue_capacity: usize,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set or cannot be
    /// parsed. Calls `dotenvy::dotenv().ok()` to optionally load a `.env`
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ListenAddr`] if `LISTEN_ADDR` is set but
    /// cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let raw_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let listen_addr = raw_addr
            .parse()
            .map_err(|source| ConfigError::ListenAddr {
                value: raw_addr.clone(),
                source,
            })?;

        let jwt_secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://usachat@localhost:5432/usachat".to_string());

        Ok(Self {
            listen_addr,
            jwt_secret,
            database_url,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10),
            database_min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 1),
            database_connect_timeout_secs: parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5),
            persistence_enabled: parse_env_bool("PERSISTENCE_ENABLED", true),
            history_retention: parse_env("HISTORY_RETENTION", 1_000),
            history_limit: parse_env("HISTORY_LIMIT", 100).clamp(1, MAX_HISTORY_LIMIT),
            auth_timeout_secs: parse_env("AUTH_TIMEOUT_SECS", 30),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 10),
            outbound_queue_capacity: parse_env(
                "OUTBOUND_QUEUE_CAPACITY",
                DEFAULT_OUTBOUND_CAPACITY,
            )
            .max(1),
        })
    }

    /// Returns `true` if the development fallback secret is in use.
    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Idle-auth timeout, or `None` when disabled.
    #[must_use]
    pub fn auth_timeout(&self) -> Option<Duration> {
        (self.auth_timeout_secs > 0).then(|| Duration::from_secs(self.auth_timeout_secs))
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("listen_addr", &self.listen_addr)
            .field("jwt_secret", &"<redacted>")
            .field("database_url", &redact_url(&self.database_url))
            .field("database_max_connections", &self.database_max_connections)
            .field("database_min_connections", &self.database_min_connections)
            .field(
                "database_connect_timeout_secs",
                &self.database_connect_timeout_secs,
            )
            .field("persistence_enabled", &self.persistence_enabled)
            .field("history_retention", &self.history_retention)
            .field("history_limit", &self.history_limit)
            .field("auth_timeout_secs", &self.auth_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("outbound_queue_capacity", &self.outbound_queue_capacity)
            .finish()
    }
}

/// Strips the userinfo part of a connection URL.
fn redact_url(url: &str) -> String {
    match (url.split_once("://"), url.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, host))) => format!("{scheme}://<redacted>@{host}"),
        _ => url.to_string(),
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RelayConfig {
        RelayConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            jwt_secret: "hunter2".to_string(),
            database_url: "postgres://chat:pw@db:5432/chat".to_string(),
            database_max_connections: 10,
            database_min_connections: 1,
            database_connect_timeout_secs: 5,
            persistence_enabled: false,
            history_retention: 1_000,
            history_limit: 100,
            auth_timeout_secs: 30,
            request_timeout_secs: 10,
            outbound_queue_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("chat:pw"));
        assert!(rendered.contains("postgres://<redacted>@db:5432/chat"));
    }

    #[test]
    fn zero_auth_timeout_disables_it() {
        let mut config = sample();
        assert_eq!(config.auth_timeout(), Some(Duration::from_secs(30)));
        config.auth_timeout_secs = 0;
        assert_eq!(config.auth_timeout(), None);
    }

    #[test]
    fn url_without_credentials_is_unchanged() {
        assert_eq!(redact_url("postgres://localhost/chat"), "postgres://localhost/chat");
    }

    #[test]
    fn missing_variables_fall_back() {
        assert_eq!(parse_env("CHAT_RELAY_TEST_UNSET_NUMBER", 7_u32), 7);
        assert!(parse_env_bool("CHAT_RELAY_TEST_UNSET_BOOL", true));
    }
}
