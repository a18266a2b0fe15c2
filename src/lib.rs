//! # chat-relay
//!
//! Minimal real-time chat service. Clients fetch recent history over REST,
//! open a WebSocket, authenticate with a bearer token, and then every
//! message they post is persisted and broadcast to all authenticated
//! connections.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS transport loop + ProtocolHandler (ws/)
//!     │
//!     ├── ChatService (service/)
//!     │
//!     ├── ConnectionRegistry (domain/)
//!     ├── CredentialService (auth/) ── JWT
//!     └── HistoryStore (store/) ── PostgreSQL / in-memory
//! ```
//!
//! ## Wire protocol
//!
//! Inbound: `{"type":"auth","token":..}`, `{"type":"message","content":..}`.
//! Outbound: `{"type":"auth_ok"}`, `{"type":"auth_fail"}`,
//! `{"type":"message","sender_id":..,"content":..,"created_at":..}`.

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod store;
pub mod ws;

#[cfg(test)]
mod testing;
