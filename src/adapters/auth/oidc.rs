//! OIDC adapter for bearer-token validation.
//!
//! Implements the `SessionValidator` port against any OIDC provider that
//! publishes a JWKS document. Tokens are checked by:
//!
//! 1. Looking up the signing key by `kid` in the (cached) JWKS
//! 2. Verifying the signature
//! 3. Validating issuer, audience, and expiry
//! 4. Mapping claims to `AuthenticatedUser`
//!
//! An unconfigured validator (no issuer or audience) rejects every token
//! with `ServiceUnavailable` instead of failing startup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the OIDC validator.
#[derive(Debug, Clone, Default)]
pub struct OidcConfig {
    /// Expected `iss` claim.
    pub issuer: String,

    /// Expected `aud` claim.
    pub audience: String,

    /// JWKS location. Defaults to `{issuer}/.well-known/jwks.json`.
    pub jwks_url: Option<String>,

    pub jwks_cache_ttl: Option<Duration>,
}

impl OidcConfig {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_url: None,
            jwks_cache_ttl: None,
        }
    }

    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = Some(url.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = Some(ttl);
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.issuer.trim().is_empty() && !self.audience.trim().is_empty()
    }

    fn jwks_url(&self) -> String {
        self.jwks_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| format!("{}/.well-known/jwks.json", self.issuer.trim_end_matches('/')))
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
}

struct JwksCache {
    jwks: JwkSet,
    fetched_at: Instant,
    ttl: Duration,
}

impl JwksCache {
    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.ttl
    }
}

/// Production `SessionValidator` for OIDC ID tokens.
pub struct OidcSessionValidator {
    config: OidcConfig,
    http_client: reqwest::Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
}

impl OidcSessionValidator {
    /// Keys are fetched lazily on first validation.
    pub fn new(config: OidcConfig) -> Result<Self, AuthError> {
        if !config.is_configured() {
            tracing::error!("OIDC issuer/audience not configured; all bearer tokens will be rejected");
        }

        let http_client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::service_unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            jwks_cache: Arc::new(RwLock::new(None)),
        })
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self.config.jwks_url();
        tracing::debug!(%url, "Fetching JWKS");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch JWKS");
            AuthError::service_unavailable(format!("Failed to fetch JWKS: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "JWKS endpoint returned an error");
            return Err(AuthError::service_unavailable(format!("JWKS endpoint returned {}", status)));
        }

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS");
            AuthError::service_unavailable(format!("Failed to parse JWKS: {}", e))
        })
    }

    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| !c.is_expired()) {
                return Ok(cached.jwks.clone());
            }
        }

        let jwks = self.fetch_jwks().await?;
        *self.jwks_cache.write().await = Some(JwksCache {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
            ttl: self.config.jwks_cache_ttl.unwrap_or(DEFAULT_JWKS_CACHE_TTL),
        });
        Ok(jwks)
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }
}

fn decoding_key(header: &jsonwebtoken::Header, jwks: &JwkSet) -> Result<(DecodingKey, Algorithm), AuthError> {
    let kid = header.kid.as_ref().ok_or_else(|| {
        tracing::warn!("JWT missing 'kid' header");
        AuthError::InvalidToken
    })?;

    let jwk = jwks.find(kid).ok_or_else(|| {
        tracing::warn!(kid = %kid, "No matching key in JWKS");
        AuthError::InvalidToken
    })?;

    use jsonwebtoken::jwk::KeyAlgorithm;
    let algorithm = match jwk.common.key_algorithm {
        Some(KeyAlgorithm::RS256) | None => Algorithm::RS256,
        Some(KeyAlgorithm::RS384) => Algorithm::RS384,
        Some(KeyAlgorithm::RS512) => Algorithm::RS512,
        Some(KeyAlgorithm::ES256) => Algorithm::ES256,
        Some(KeyAlgorithm::ES384) => Algorithm::ES384,
        Some(other) => {
            tracing::warn!(algorithm = ?other, "Unsupported JWK algorithm");
            return Err(AuthError::InvalidToken);
        }
    };

    let key = DecodingKey::from_jwk(jwk).map_err(|e| {
        tracing::warn!(error = %e, "Failed to build decoding key");
        AuthError::InvalidToken
    })?;

    Ok((key, algorithm))
}

#[async_trait]
impl SessionValidator for OidcSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if !self.config.is_configured() {
            return Err(AuthError::service_unavailable("token verification is not configured"));
        }

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode JWT header");
            AuthError::InvalidToken
        })?;

        let jwks = self.get_jwks().await?;
        let (key, algorithm) = decoding_key(&header, &jwks)?;

        let claims = decode::<IdTokenClaims>(token, &key, &self.validation(algorithm))
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::warn!(error = %e, "Token validation failed");
                    AuthError::InvalidToken
                }
            })?
            .claims;

        let user_id = UserId::new(claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthenticatedUser::new(
            user_id,
            claims.email,
            claims.email_verified.unwrap_or(false),
        ))
    }
}

impl std::fmt::Debug for OidcSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcSessionValidator")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}
