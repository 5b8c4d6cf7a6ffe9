//! Bearer-token verification configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::auth::OidcConfig;

/// OIDC token verification settings.
///
/// Every field may be left empty; the validator then rejects all tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Expected `iss` claim, e.g. `https://securetoken.google.com/<project>`
    #[serde(default)]
    pub issuer: String,

    /// Expected `aud` claim
    #[serde(default)]
    pub audience: String,

    /// JWKS endpoint; defaults to `{issuer}/.well-known/jwks.json`
    #[serde(default)]
    pub jwks_url: Option<String>,

    /// JWKS cache TTL in seconds
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,
}

impl AuthConfig {
    /// Get JWKS cache TTL as Duration
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    pub fn is_configured(&self) -> bool {
        !self.issuer.trim().is_empty() && !self.audience.trim().is_empty()
    }

    /// Settings for `OidcSessionValidator`.
    pub fn oidc_config(&self) -> OidcConfig {
        let config = OidcConfig::new(self.issuer.trim(), self.audience.trim())
            .with_cache_ttl(self.jwks_cache_ttl());
        match self.jwks_url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => config.with_jwks_url(url),
            None => config,
        }
    }

    /// An unconfigured issuer is allowed; a plain-HTTP issuer is not, in
    /// production.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if *environment == Environment::Production
            && self.is_configured()
            && !self.issuer.starts_with("https://")
        {
            return Err(ValidationError::IssuerMustBeHttps);
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            jwks_url: None,
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
        }
    }
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}
