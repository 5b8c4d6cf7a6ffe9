//! Payment gateway port for the processor's partner and PG APIs.
//!
//! Calls return the processor's raw JSON response. Interpreting it (ids,
//! statuses) is the caller's job, because response shapes drift between
//! API versions.
//!
//! # Design
//!
//! - **Bounded**: every call has a timeout; a timeout is a failure
//! - **Idempotent**: subscription and payment creation carry an
//!   idempotency key so retries do not create duplicates

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::mandate::{ManageAction, MandateError};
use crate::domain::merchant::OnboardingLinkType;

/// Port for the payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a sub-merchant under the partner account.
    async fn create_merchant(&self, merchant_info: &Value) -> Result<Value, GatewayError>;

    /// Create an onboarding link for a merchant.
    async fn create_onboarding_link(
        &self,
        merchant_id: &str,
        link_type: OnboardingLinkType,
        return_url: &str,
    ) -> Result<Value, GatewayError>;

    /// Fetch merchant details, including onboarding status.
    async fn get_merchant(&self, merchant_id: &str) -> Result<Value, GatewayError>;

    /// Create a subscription (mandate) for a merchant.
    async fn create_subscription(
        &self,
        merchant_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> Result<Value, GatewayError>;

    /// Raise a payment (AUTH or CHARGE) against a subscription.
    async fn create_payment(
        &self,
        merchant_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> Result<Value, GatewayError>;

    /// Cancel, pause or activate a subscription.
    async fn manage_subscription(
        &self,
        merchant_id: &str,
        subscription_id: &str,
        action: ManageAction,
    ) -> Result<Value, GatewayError>;
}

/// Payment gateway error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// HTTP status returned by the processor, when there was a response.
    pub status: Option<u16>,
    /// Response body, kept for diagnosis.
    pub body: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            body: None,
        }
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NotConfigured, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    /// Non-success status from the processor.
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self {
            code: GatewayErrorCode::Rejected,
            message: format!("processor returned status {}", status),
            status: Some(status),
            body: Some(body.into()),
        }
    }

    /// Response that could not be parsed as JSON.
    pub fn invalid_response(status: u16, body: impl Into<String>) -> Self {
        Self {
            code: GatewayErrorCode::InvalidResponse,
            message: "invalid JSON from processor".to_string(),
            status: Some(status),
            body: Some(body.into()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable() || self.status.is_some_and(|s| s >= 500 || s == 429)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Gateway error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorCode {
    /// Partner credentials missing; every call fails fast.
    NotConfigured,
    /// Connection or transport failure.
    Network,
    /// No response within the configured timeout.
    Timeout,
    /// Processor answered with a non-success status.
    Rejected,
    /// Processor answered with a body that is not JSON.
    InvalidResponse,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayErrorCode::Network | GatewayErrorCode::Timeout)
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NotConfigured => "not_configured",
            GatewayErrorCode::Network => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::Rejected => "rejected",
            GatewayErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

impl From<GatewayError> for MandateError {
    fn from(err: GatewayError) -> Self {
        let message = match &err.body {
            Some(body) if !body.is_empty() => format!("{}: {}", err.message, body),
            _ => err.message.clone(),
        };
        MandateError::upstream(err.status, message)
    }
}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        let code = match err.code {
            GatewayErrorCode::NotConfigured => ErrorCode::GatewayNotConfigured,
            _ => ErrorCode::UpstreamError,
        };
        let mut domain = DomainError::new(code, err.message);
        if let Some(status) = err.status {
            domain = domain.with_detail("upstream_status", status.to_string());
        }
        domain
    }
}
