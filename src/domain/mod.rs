//! Domain layer: connection identity, auth state, message records, and
//! the connection registry.
//!
//! Everything here is transport-agnostic. The WebSocket layer feeds
//! decoded frames in and drains each connection's outbound queue.

pub mod connection;
pub mod connection_id;
pub mod connection_registry;
pub mod message;
pub mod subject_id;

pub use connection::{AuthState, Connection, Outbound, SendError, TransportError};
pub use connection_id::ConnectionId;
pub use connection_registry::{BroadcastOutcome, ConnectionRegistry};
pub use message::{ChatMessage, MessageClock, MessageError};
pub use subject_id::SubjectId;
