//! Payment gateway configuration (Cashfree)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::cashfree::{
    CashfreeConfig, CashfreeEnvironment, DEFAULT_PARTNER_API_VERSION, DEFAULT_PG_API_VERSION,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::domain::mandate::{SignatureVerifier, DEFAULT_TOLERANCE_SECS};

/// Processor credentials and endpoints.
///
/// Missing secrets are not an error here. The adapter and the signature
/// verifier each log the gap and refuse work at call time.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Partner API key
    #[serde(default)]
    pub partner_api_key: Option<SecretString>,

    /// Webhook signing secret; the partner key signs webhooks when unset
    #[serde(default)]
    pub webhook_secret: Option<SecretString>,

    #[serde(default)]
    pub environment: CashfreeEnvironment,

    #[serde(default = "default_partner_api_version")]
    pub partner_api_version: String,

    #[serde(default = "default_pg_api_version")]
    pub pg_api_version: String,

    /// Accepted clock skew for webhook timestamps
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Overrides the environment's partners endpoint
    #[serde(default)]
    pub partners_base_url: Option<String>,

    /// Overrides the environment's PG endpoint
    #[serde(default)]
    pub pg_base_url: Option<String>,

    /// Prefix of audit event types
    #[serde(default = "default_audit_namespace")]
    pub audit_namespace: String,
}

impl GatewayConfig {
    /// Secret used to verify webhook signatures.
    pub fn signing_secret(&self) -> Option<SecretString> {
        self.webhook_secret
            .clone()
            .filter(|secret| !secret.expose_secret().trim().is_empty())
            .or_else(|| self.partner_api_key.clone())
    }

    pub fn signature_verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(self.signing_secret(), self.webhook_tolerance_secs)
    }

    /// Settings for `CashfreeGatewayAdapter`.
    pub fn cashfree_config(&self) -> CashfreeConfig {
        let config = CashfreeConfig::new(self.partner_api_key.clone(), self.environment)
            .with_api_versions(&self.partner_api_version, &self.pg_api_version)
            .with_timeout(Duration::from_secs(self.request_timeout_secs));

        match (&self.partners_base_url, &self.pg_base_url) {
            (None, None) => config,
            (partners, pg) => config.with_base_urls(
                partners
                    .clone()
                    .unwrap_or_else(|| self.environment.partners_base_url().to_string()),
                pg.clone()
                    .unwrap_or_else(|| self.environment.pg_base_url().to_string()),
            ),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_tolerance_secs <= 0 || self.webhook_tolerance_secs > 3600 {
            return Err(ValidationError::InvalidWebhookTolerance);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        for (name, url) in [
            ("partners_base_url", &self.partners_base_url),
            ("pg_base_url", &self.pg_base_url),
        ] {
            if let Some(url) = url {
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(ValidationError::InvalidBaseUrl(name));
                }
            }
        }
        let namespace = self.audit_namespace.trim();
        if namespace.is_empty() || namespace.contains('.') {
            return Err(ValidationError::InvalidAuditNamespace);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            partner_api_key: None,
            webhook_secret: None,
            environment: CashfreeEnvironment::default(),
            partner_api_version: default_partner_api_version(),
            pg_api_version: default_pg_api_version(),
            webhook_tolerance_secs: default_webhook_tolerance(),
            request_timeout_secs: default_request_timeout(),
            partners_base_url: None,
            pg_base_url: None,
            audit_namespace: default_audit_namespace(),
        }
    }
}

fn default_partner_api_version() -> String {
    DEFAULT_PARTNER_API_VERSION.to_string()
}

fn default_pg_api_version() -> String {
    DEFAULT_PG_API_VERSION.to_string()
}

fn default_webhook_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_audit_namespace() -> String {
    "cashfree".to_string()
}
