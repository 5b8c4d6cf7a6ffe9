//! Caller identity and the ways establishing it can fail.

use super::UserId;
use thiserror::Error;

/// The caller behind a verified bearer token.
///
/// Only `id` is relied on: it is recorded as the acting user on mandates
/// and merchant links when a request body does not name one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: Option<String>,
    pub email_verified: bool,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, email: Option<String>, email_verified: bool) -> Self {
        Self {
            id,
            email,
            email_verified,
        }
    }
}

/// Why a bearer token did not yield an `AuthenticatedUser`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Malformed, wrongly signed, or issued for someone else.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    /// Identity provider unreachable, or no issuer configured.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// The token was never judged; the caller is not at fault.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }

    /// Message safe to return to the caller. Provider details stay in logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::InvalidToken => "Invalid token",
            AuthError::TokenExpired => "Token expired",
            AuthError::ServiceUnavailable(_) => "Authentication service unavailable",
        }
    }
}
