//! HS256 JSON Web Token verification and issuance.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::{AuthError, CredentialService};
use crate::domain::SubjectId;

/// Default lifetime of issued tokens (7 days).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Integer for accounts created by the signup service, string otherwise.
    #[serde(default)]
    id: Option<SubjectId>,
    #[serde(default)]
    iat: i64,
    exp: i64,
}

/// Verifies HS256 tokens signed with a shared secret.
pub struct JwtCredentialService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtCredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCredentialService")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl JwtCredentialService {
    /// Creates a service for the given shared secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::default(),
        }
    }

    /// Issues a token for `subject` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if signing fails.
    pub fn issue(&self, subject: &SubjectId, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            id: Some(subject.clone()),
            iat: now,
            exp: now.saturating_add(ttl),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn decode_subject(&self, token: &str) -> Result<SubjectId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;
        match data.claims.id {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(AuthError::MissingSubject),
        }
    }
}

#[async_trait]
impl CredentialService for JwtCredentialService {
    async fn verify(&self, token: &str) -> Result<SubjectId, AuthError> {
        self.decode_subject(token)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn sign(secret: &[u8], claims: &serde_json::Value) -> String {
        let Ok(token) = encode(&Header::default(), claims, &EncodingKey::from_secret(secret)) else {
            panic!("signing failed");
        };
        token
    }

    #[tokio::test]
    async fn issued_token_verifies() {
        let service = JwtCredentialService::new(b"secret");
        let subject = SubjectId::new("alice");
        let Ok(token) = service.issue(&subject, DEFAULT_TOKEN_TTL) else {
            panic!("issue failed");
        };
        assert_eq!(service.verify(&token).await, Ok(subject));
    }

    #[tokio::test]
    async fn numeric_id_claim_is_accepted() {
        let service = JwtCredentialService::new(b"secret");
        let exp = Utc::now().timestamp() + 3600;
        let token = sign(b"secret", &serde_json::json!({"id": 17, "iat": 0, "exp": exp}));
        assert_eq!(service.verify(&token).await, Ok(SubjectId::Number(17)));
    }

    #[tokio::test]
    async fn numeric_subject_round_trips_as_number() {
        let service = JwtCredentialService::new(b"secret");
        let Ok(token) = service.issue(&SubjectId::from(17_i64), DEFAULT_TOKEN_TTL) else {
            panic!("issue failed");
        };
        let Ok(subject) = service.verify(&token).await else {
            panic!("verify failed");
        };
        assert_eq!(serde_json::to_value(&subject).ok(), Some(serde_json::json!(17)));
    }

    #[tokio::test]
    async fn empty_string_subject_is_rejected() {
        let service = JwtCredentialService::new(b"secret");
        let exp = Utc::now().timestamp() + 3600;
        let token = sign(b"secret", &serde_json::json!({"id": "", "iat": 0, "exp": exp}));
        assert_eq!(service.verify(&token).await, Err(AuthError::MissingSubject));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let issuer = JwtCredentialService::new(b"one");
        let verifier = JwtCredentialService::new(b"two");
        let Ok(token) = issuer.issue(&SubjectId::new("a"), DEFAULT_TOKEN_TTL) else {
            panic!("issue failed");
        };
        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let service = JwtCredentialService::new(b"secret");
        let exp = Utc::now().timestamp() - 3600;
        let token = sign(b"secret", &serde_json::json!({"id": "a", "iat": 0, "exp": exp}));
        assert_eq!(service.verify(&token).await, Err(AuthError::Expired));
    }

    #[tokio::test]
    async fn missing_subject_is_rejected() {
        let service = JwtCredentialService::new(b"secret");
        let exp = Utc::now().timestamp() + 3600;
        let token = sign(b"secret", &serde_json::json!({"iat": 0, "exp": exp}));
        assert_eq!(service.verify(&token).await, Err(AuthError::MissingSubject));
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let service = JwtCredentialService::new(b"secret");
        assert!(matches!(
            service.verify("not-a-jwt").await,
            Err(AuthError::InvalidToken(_))
        ));
    }
}
