//! WebSocket layer: wire frames, the per-connection protocol handler,
//! and the transport loop.
//!
//! The endpoint at `/ws` carries JSON frames. A client authenticates with
//! an `auth` frame, then sends `message` frames that are broadcast to
//! every authenticated connection.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod protocol;
