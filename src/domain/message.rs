//! Chat message records and the server clock that stamps them.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::SubjectId;

/// Rejection reasons for an inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// Content is empty or whitespace-only.
    #[error("message content is empty")]
    EmptyContent,
}

/// One chat message as persisted and broadcast.
///
/// Immutable once created. `created_at` is always assigned by the server
/// through a [`MessageClock`], never taken from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Subject bound to the sending connection.
    pub sender_id: SubjectId,
    /// Message body as sent by the client.
    pub content: String,
    /// Server-assigned creation time, millisecond precision.
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Builds a message record, rejecting blank content.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::EmptyContent`] if `content` is empty after
    /// trimming whitespace.
    pub fn new(
        sender_id: SubjectId,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, MessageError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(MessageError::EmptyContent);
        }
        Ok(Self {
            sender_id,
            content,
            created_at,
        })
    }
}

/// Writes timestamps as `2026-01-01T00:00:00.000Z`.
fn serialize_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Server clock producing non-decreasing, millisecond-truncated timestamps.
///
/// Wall-clock steps backwards are absorbed by repeating the last issued
/// instant, so records stamped in sequence never go back in time.
#[derive(Debug, Default)]
pub struct MessageClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MessageClock {
    /// Creates a clock with no issued timestamps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current time, never earlier than the previous call.
    pub fn now(&self) -> DateTime<Utc> {
        self.observe(Utc::now())
    }

    fn observe(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let wall = wall.trunc_subsecs(3);
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let ts = match *last {
            Some(prev) if prev > wall => prev,
            _ => wall,
        };
        *last = Some(ts);
        ts
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        let Some(ts) = Utc.timestamp_millis_opt(ms).single() else {
            panic!("valid timestamp");
        };
        ts
    }

    #[test]
    fn rejects_blank_content() {
        let sender = SubjectId::new("a");
        assert_eq!(
            ChatMessage::new(sender.clone(), "", at(0)),
            Err(MessageError::EmptyContent)
        );
        assert_eq!(
            ChatMessage::new(sender, " \t\n ", at(0)),
            Err(MessageError::EmptyContent)
        );
    }

    #[test]
    fn keeps_content_untrimmed() {
        let Ok(msg) = ChatMessage::new(SubjectId::new("a"), "  hi  ", at(0)) else {
            panic!("content is not blank");
        };
        assert_eq!(msg.content, "  hi  ");
    }

    #[test]
    fn created_at_serializes_with_millis() {
        let Ok(msg) = ChatMessage::new(SubjectId::new("7"), "hi", at(1_700_000_000_000)) else {
            panic!("valid message");
        };
        let Ok(value) = serde_json::to_value(&msg) else {
            panic!("serializable");
        };
        assert_eq!(value["created_at"], "2023-11-14T22:13:20.000Z");
        assert_eq!(value["sender_id"], "7");
    }

    #[test]
    fn clock_never_goes_backwards() {
        let clock = MessageClock::new();
        let first = clock.observe(at(5_000));
        let stepped_back = clock.observe(at(4_000));
        let later = clock.observe(at(6_000));
        assert_eq!(first, at(5_000));
        assert_eq!(stepped_back, at(5_000));
        assert_eq!(later, at(6_000));
    }

    #[test]
    fn clock_truncates_to_millis() {
        let clock = MessageClock::new();
        let ts = clock.now();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
