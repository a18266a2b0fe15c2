//! Service layer: chat orchestration.
//!
//! [`ChatService`] ties the credential service, the history store, and the
//! [`super::domain::ConnectionRegistry`] together.

pub mod chat_service;

pub use chat_service::ChatService;
