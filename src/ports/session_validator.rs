//! Bearer-token verification port.
//!
//! The API routes only need a caller id. The production adapter gets it from
//! OIDC ID tokens checked against the issuer's JWKS; tests use a fixed
//! token table.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Turns a raw bearer token into the caller it was issued to.
///
/// Implementations check issuer, audience and expiry, and report:
///
/// - `InvalidToken` for anything malformed, unsigned or mis-addressed
/// - `TokenExpired` once `exp` has passed
/// - `ServiceUnavailable` when keys cannot be obtained or no issuer is set
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// `token` is the header value after `Bearer `.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
