//! Credential verification.
//!
//! The relay only needs one thing from the credential service: turn a
//! bearer token into a [`SubjectId`]. [`CredentialService`] is the seam;
//! [`JwtCredentialService`] is the production implementation.

pub mod jwt;

use async_trait::async_trait;

pub use jwt::JwtCredentialService;

use crate::domain::SubjectId;

/// Reasons a bearer token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Token is malformed or its signature does not verify.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Token verified but carries no usable subject claim.
    #[error("token has no subject")]
    MissingSubject,
}

/// Verifies bearer tokens.
///
/// Implementations may be slow (network, key fetch); callers must not
/// hold shared locks while awaiting [`CredentialService::verify`].
#[async_trait]
pub trait CredentialService: Send + Sync + std::fmt::Debug {
    /// Verifies `token` and returns the subject it was issued to.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the token is invalid or expired.
    async fn verify(&self, token: &str) -> Result<SubjectId, AuthError>;
}
