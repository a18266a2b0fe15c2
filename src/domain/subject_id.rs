//! Authenticated subject identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Opaque identity returned by the credential service.
///
/// Bound to a connection on its first successful authentication and never
/// changed afterwards. Keeps the JSON type it was issued with: accounts
/// from the signup service carry integer ids, other issuers may use
/// strings. Either way it serializes back as the same JSON value.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(untagged)]
pub enum SubjectId {
    /// Integer account id.
    Number(i64),
    /// String identifier.
    Text(String),
}

impl SubjectId {
    /// Wraps a string identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::Text(id.into())
    }

    /// Returns `true` for an empty string identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(id) if id.is_empty())
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<i64> for SubjectId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_stay_numbers() {
        let json = serde_json::to_value(SubjectId::from(42_i64)).ok();
        assert_eq!(json, Some(serde_json::json!(42)));
    }

    #[test]
    fn string_ids_stay_strings() {
        let json = serde_json::to_string(&SubjectId::new("alice")).ok();
        assert_eq!(json.as_deref(), Some("\"alice\""));
    }

    #[test]
    fn deserializes_either_type() {
        let number: Option<SubjectId> = serde_json::from_str("17").ok();
        let text: Option<SubjectId> = serde_json::from_str("\"17\"").ok();
        assert_eq!(number, Some(SubjectId::Number(17)));
        assert_eq!(text, Some(SubjectId::new("17")));
    }

    #[test]
    fn display_renders_bare_value() {
        assert_eq!(SubjectId::from(7_i64).to_string(), "7");
        assert_eq!(SubjectId::new("bob").to_string(), "bob");
    }
}
