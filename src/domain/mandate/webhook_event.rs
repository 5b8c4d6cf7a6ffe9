//! Processor webhook envelope and event types.

use std::fmt;

use serde_json::Value;

use super::identifiers::{self, SubscriptionKeys};
use super::payment::{Money, PaymentStatus, PaymentType, RefundDetails, DEFAULT_CURRENCY};
use super::webhook_errors::WebhookError;

/// Webhook event types the reconciler dispatches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WebhookEventType {
    SubscriptionStatusChanged,
    SubscriptionAuthStatus,
    SubscriptionPaymentNotificationInitiated,
    SubscriptionPaymentSuccess,
    SubscriptionPaymentFailed,
    SubscriptionPaymentCancelled,
    SubscriptionRefundStatus,
    SubscriptionCardExpiryReminder,
    MerchantOnboardingStatus,
    Unknown(String),
}

impl WebhookEventType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "SUBSCRIPTION_STATUS_CHANGED" => Self::SubscriptionStatusChanged,
            "SUBSCRIPTION_AUTH_STATUS" => Self::SubscriptionAuthStatus,
            "SUBSCRIPTION_PAYMENT_NOTIFICATION_INITIATED" => Self::SubscriptionPaymentNotificationInitiated,
            "SUBSCRIPTION_PAYMENT_SUCCESS" => Self::SubscriptionPaymentSuccess,
            "SUBSCRIPTION_PAYMENT_FAILED" => Self::SubscriptionPaymentFailed,
            "SUBSCRIPTION_PAYMENT_CANCELLED" => Self::SubscriptionPaymentCancelled,
            "SUBSCRIPTION_REFUND_STATUS" => Self::SubscriptionRefundStatus,
            "SUBSCRIPTION_CARD_EXPIRY_REMINDER" => Self::SubscriptionCardExpiryReminder,
            "MERCHANT_ONBOARDING_STATUS" | "MERCHANT_ONBOARDING" => Self::MerchantOnboardingStatus,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SubscriptionStatusChanged => "SUBSCRIPTION_STATUS_CHANGED",
            Self::SubscriptionAuthStatus => "SUBSCRIPTION_AUTH_STATUS",
            Self::SubscriptionPaymentNotificationInitiated => "SUBSCRIPTION_PAYMENT_NOTIFICATION_INITIATED",
            Self::SubscriptionPaymentSuccess => "SUBSCRIPTION_PAYMENT_SUCCESS",
            Self::SubscriptionPaymentFailed => "SUBSCRIPTION_PAYMENT_FAILED",
            Self::SubscriptionPaymentCancelled => "SUBSCRIPTION_PAYMENT_CANCELLED",
            Self::SubscriptionRefundStatus => "SUBSCRIPTION_REFUND_STATUS",
            Self::SubscriptionCardExpiryReminder => "SUBSCRIPTION_CARD_EXPIRY_REMINDER",
            Self::MerchantOnboardingStatus => "MERCHANT_ONBOARDING_STATUS",
            Self::Unknown(raw) => raw,
        }
    }

    /// True for events scoped to a subscription (and so to a mandate).
    pub fn is_subscription_event(&self) -> bool {
        match self {
            Self::MerchantOnboardingStatus => false,
            Self::Unknown(raw) => raw.starts_with("SUBSCRIPTION_"),
            _ => true,
        }
    }

    /// Events acknowledged without touching any record.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            Self::SubscriptionPaymentNotificationInitiated | Self::SubscriptionCardExpiryReminder
        )
    }
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified, parsed webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayWebhook {
    pub event_type: WebhookEventType,
    pub event_time: Option<String>,
    /// Whole parsed body; field paths start at `data`.
    pub payload: Value,
}

impl GatewayWebhook {
    /// Parses the raw body of a delivery.
    ///
    /// # Errors
    ///
    /// - `ParseError` - body is not a JSON object
    /// - `MissingField` - no `type`
    pub fn parse(raw_body: &[u8]) -> Result<Self, WebhookError> {
        let payload: Value =
            serde_json::from_slice(raw_body).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        Self::from_value(payload)
    }

    pub fn from_value(payload: Value) -> Result<Self, WebhookError> {
        if !payload.is_object() {
            return Err(WebhookError::ParseError("expected a JSON object".to_string()));
        }
        let event_type = payload
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .map(WebhookEventType::parse)
            .ok_or(WebhookError::MissingField("type"))?;
        let event_time = payload
            .get("event_time")
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        Ok(Self {
            event_type,
            event_time,
            payload,
        })
    }

    pub fn data(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.payload.get("data").unwrap_or(&NULL)
    }

    pub fn subscription_keys(&self) -> SubscriptionKeys {
        SubscriptionKeys::from_payload(&self.payload)
    }

    pub fn payment_id(&self) -> Option<String> {
        identifiers::PAYMENT_ID.extract(&self.payload)
    }

    /// Dedup ledger key: `{type}|{event_time}|{payment_id or NA}`.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.event_type,
            self.event_time.as_deref().unwrap_or("NA"),
            self.payment_id().as_deref().unwrap_or("NA")
        )
    }

    /// Payment fields of a payment notification, if it names a payment.
    pub fn payment(&self) -> Option<PaymentNotification> {
        PaymentNotification::from_payload(&self.payload)
    }
}

/// Payment fields extracted from a payment notification.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotification {
    pub payment_id: String,
    pub cf_payment_id: Option<String>,
    pub payment_type: Option<PaymentType>,
    pub payment_status: Option<PaymentStatus>,
    pub amount: Option<Money>,
    pub currency: String,
    pub failure_reason: Option<String>,
    pub refund: Option<RefundDetails>,
}

impl PaymentNotification {
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let payment_id = identifiers::PAYMENT_ID.extract(payload)?;
        let refund_id = identifiers::REFUND_ID.extract(payload);
        let refund_status = identifiers::REFUND_STATUS.extract(payload);
        let refund = if refund_id.is_some() || refund_status.is_some() {
            Some(RefundDetails {
                refund_id,
                refund_status,
                refund_amount_minor: identifiers::REFUND_AMOUNT
                    .extract_f64(payload)
                    .and_then(Money::from_major),
            })
        } else {
            None
        };

        Some(Self {
            payment_id,
            cf_payment_id: identifiers::CF_PAYMENT_ID.extract(payload),
            payment_type: identifiers::PAYMENT_TYPE
                .extract(payload)
                .and_then(|t| t.parse().ok()),
            payment_status: identifiers::PAYMENT_STATUS
                .extract(payload)
                .and_then(|s| s.parse().ok()),
            amount: identifiers::PAYMENT_AMOUNT
                .extract_f64(payload)
                .and_then(Money::from_major),
            currency: identifiers::PAYMENT_CURRENCY
                .extract(payload)
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            failure_reason: identifiers::FAILURE_REASON.extract(payload),
            refund,
        })
    }
}
