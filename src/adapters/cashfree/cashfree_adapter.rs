//! Cashfree payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the Cashfree partner API
//! (merchant onboarding) and PG API (subscriptions and payments).
//!
//! # Headers
//!
//! - Partner calls: `x-api-version`, `x-partner-apikey`
//! - PG calls: additionally `x-partner-merchantid`, and `x-idempotency-key`
//!   when the caller supplies one
//!
//! # Configuration
//!
//! ```ignore
//! let config = CashfreeConfig::new(Some(partner_key), CashfreeEnvironment::Sandbox);
//! let adapter = CashfreeGatewayAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::mandate::ManageAction;
use crate::domain::merchant::OnboardingLinkType;
use crate::ports::{GatewayError, PaymentGateway};

/// Partner API version sent on onboarding calls.
pub const DEFAULT_PARTNER_API_VERSION: &str = "2023-01-01";

/// PG API version sent on subscription and payment calls.
pub const DEFAULT_PG_API_VERSION: &str = "2025-01-01";

/// Bound on every outbound call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Cashfree deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashfreeEnvironment {
    #[default]
    Sandbox,
    #[serde(alias = "production")]
    Prod,
}

impl CashfreeEnvironment {
    pub fn partners_base_url(&self) -> &'static str {
        match self {
            CashfreeEnvironment::Sandbox => "https://api-sandbox.cashfree.com/partners",
            CashfreeEnvironment::Prod => "https://api.cashfree.com/partners",
        }
    }

    pub fn pg_base_url(&self) -> &'static str {
        match self {
            CashfreeEnvironment::Sandbox => "https://sandbox.cashfree.com/pg",
            CashfreeEnvironment::Prod => "https://api.cashfree.com/pg",
        }
    }
}

/// Cashfree API configuration.
#[derive(Clone)]
pub struct CashfreeConfig {
    /// Partner API key. Without it every call fails with `NotConfigured`.
    partner_api_key: Option<SecretString>,

    partners_base_url: String,
    pg_base_url: String,
    partner_api_version: String,
    pg_api_version: String,
    timeout: Duration,
}

impl CashfreeConfig {
    /// Create a configuration with the environment's default endpoints.
    pub fn new(partner_api_key: Option<SecretString>, environment: CashfreeEnvironment) -> Self {
        let partner_api_key =
            partner_api_key.filter(|key| !key.expose_secret().trim().is_empty());
        if partner_api_key.is_none() {
            tracing::error!("Cashfree partner API key is not configured; gateway calls will fail");
        }

        Self {
            partner_api_key,
            partners_base_url: environment.partners_base_url().to_string(),
            pg_base_url: environment.pg_base_url().to_string(),
            partner_api_version: DEFAULT_PARTNER_API_VERSION.to_string(),
            pg_api_version: DEFAULT_PG_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Override both base URLs (for testing against a local server).
    pub fn with_base_urls(mut self, partners: impl Into<String>, pg: impl Into<String>) -> Self {
        self.partners_base_url = trim_base(partners.into());
        self.pg_base_url = trim_base(pg.into());
        self
    }

    pub fn with_api_versions(mut self, partner: impl Into<String>, pg: impl Into<String>) -> Self {
        self.partner_api_version = partner.into();
        self.pg_api_version = pg.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.partner_api_key.is_some()
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Cashfree gateway adapter.
pub struct CashfreeGatewayAdapter {
    config: CashfreeConfig,
    http_client: reqwest::Client,
}

impl CashfreeGatewayAdapter {
    /// Create an adapter whose HTTP client enforces the configured timeout.
    pub fn new(config: CashfreeConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn partner_key(&self) -> Result<&str, GatewayError> {
        self.config
            .partner_api_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
            .ok_or_else(|| GatewayError::not_configured("Cashfree partner API key is not configured"))
    }

    fn partner_request(&self, method: Method, path: &str) -> Result<RequestBuilder, GatewayError> {
        let url = format!("{}{}", self.config.partners_base_url, path);
        Ok(self
            .http_client
            .request(method, url)
            .header("x-api-version", &self.config.partner_api_version)
            .header("x-partner-apikey", self.partner_key()?))
    }

    fn pg_request(
        &self,
        method: Method,
        path: &str,
        merchant_id: &str,
        idempotency_key: Option<&str>,
    ) -> Result<RequestBuilder, GatewayError> {
        let url = format!("{}{}", self.config.pg_base_url, path);
        let mut request = self
            .http_client
            .request(method, url)
            .header("x-api-version", &self.config.pg_api_version)
            .header("x-partner-apikey", self.partner_key()?)
            .header("x-partner-merchantid", merchant_id);

        if let Some(key) = idempotency_key.filter(|k| !k.is_empty()) {
            request = request.header("x-idempotency-key", key);
        }
        Ok(request)
    }

    /// Sends a request and classifies the outcome.
    async fn execute(&self, operation: &'static str, request: RequestBuilder) -> Result<Value, GatewayError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!(operation, "Cashfree call timed out");
                GatewayError::timeout(format!("{} timed out after {:?}", operation, self.config.timeout))
            } else {
                tracing::warn!(operation, error = %e, "Cashfree call failed");
                GatewayError::network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::timeout(format!("{} timed out reading the response", operation))
            } else {
                GatewayError::network(e.to_string())
            }
        })?;

        if !(200..300).contains(&status) {
            tracing::error!(operation, status, body = %body, "Cashfree rejected the request");
            return Err(GatewayError::rejected(status, body));
        }

        parse_body(status, &body).map_err(|err| {
            tracing::error!(operation, status, "Cashfree returned a non-JSON body");
            err
        })
    }
}

/// Success bodies must be JSON; an empty body is an empty object.
fn parse_body(status: u16, body: &str) -> Result<Value, GatewayError> {
    if body.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(body).map_err(|_| GatewayError::invalid_response(status, body))
}

#[async_trait]
impl PaymentGateway for CashfreeGatewayAdapter {
    async fn create_merchant(&self, merchant_info: &Value) -> Result<Value, GatewayError> {
        let request = self.partner_request(Method::POST, "/merchants")?.json(merchant_info);
        self.execute("create_merchant", request).await
    }

    async fn create_onboarding_link(
        &self,
        merchant_id: &str,
        link_type: OnboardingLinkType,
        return_url: &str,
    ) -> Result<Value, GatewayError> {
        let path = format!("/merchants/{}/{}", merchant_id, link_type.path_suffix());
        let request = self.partner_request(Method::POST, &path)?.json(&json!({
            "type": "account_onboarding",
            "return_url": return_url,
        }));
        self.execute("create_onboarding_link", request).await
    }

    async fn get_merchant(&self, merchant_id: &str) -> Result<Value, GatewayError> {
        let path = format!("/merchants/{}", merchant_id);
        let request = self.partner_request(Method::GET, &path)?;
        self.execute("get_merchant", request).await
    }

    async fn create_subscription(
        &self,
        merchant_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> Result<Value, GatewayError> {
        let request = self
            .pg_request(Method::POST, "/subscriptions", merchant_id, Some(idempotency_key))?
            .json(payload);
        self.execute("create_subscription", request).await
    }

    async fn create_payment(
        &self,
        merchant_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> Result<Value, GatewayError> {
        let request = self
            .pg_request(Method::POST, "/subscriptions/pay", merchant_id, Some(idempotency_key))?
            .json(payload);
        self.execute("create_payment", request).await
    }

    async fn manage_subscription(
        &self,
        merchant_id: &str,
        subscription_id: &str,
        action: ManageAction,
    ) -> Result<Value, GatewayError> {
        let path = format!("/subscriptions/{}/manage", subscription_id);
        let request = self.pg_request(Method::POST, &path, merchant_id, None)?.json(&json!({
            "subscription_id": subscription_id,
            "action": action.as_str(),
        }));
        self.execute("manage_subscription", request).await
    }
}
