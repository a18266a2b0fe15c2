//! Message history DTOs.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::SubjectId;
use crate::store::StoredMessage;

/// Query parameters for `GET /api/messages`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Number of most recent messages to return (1–500). Defaults to the
    /// server's configured history limit.
    pub limit: Option<usize>,
}

/// One message in a history response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageDto {
    /// Store-assigned message id.
    pub id: i64,
    /// Sender subject id, with the JSON type it was issued with.
    pub sender_id: SubjectId,
    /// Message body.
    pub content: String,
    /// RFC 3339 UTC creation time with millisecond precision.
    pub created_at: String,
}

impl From<StoredMessage> for MessageDto {
    fn from(StoredMessage { id, message }: StoredMessage) -> Self {
        Self {
            id,
            sender_id: message.sender_id,
            content: message.content,
            created_at: message
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
