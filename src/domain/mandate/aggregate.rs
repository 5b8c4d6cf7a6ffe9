//! Mandate and enrollment documents.
//!
//! A mandate is one recurring-payment authorization. It may be reachable
//! through up to three identifiers (`local_id`, `subscription_id`,
//! `cf_subscription_id`) but always lives in exactly one document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::payment::{Money, PaymentStatus};
use super::status::{AuthStatus, SubscriptionStatus};
use crate::domain::foundation::Timestamp;

/// Stored field names used in queries and conditional writes.
///
/// Amounts are stored in minor units (paise): a 500 INR charge adds 50 000
/// to the enrollment's `paid_amount_minor`.
pub mod fields {
    pub const SUBSCRIPTION_ID: &str = "subscription_id";
    pub const CF_SUBSCRIPTION_ID: &str = "cf_subscription_id";
    pub const SUBSCRIPTION_STATUS: &str = "subscription_status";
    pub const AUTH_STATUS: &str = "auth_status";
    pub const PAYMENT_STATUS: &str = "payment_status";
    /// Cumulative paid total on an enrollment, in minor units.
    pub const PAID_AMOUNT: &str = "paid_amount_minor";
}

/// Stored mandate document.
///
/// Every field is optional so the same shape doubles as a merge patch:
/// absent fields are left untouched by a merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MandateRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cf_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_status: Option<AuthStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_schedule_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_charge_time: Option<String>,
    #[serde(rename = "merchantId", skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "enrollmentId", skip_serializing_if = "Option::is_none")]
    pub enrollment_id: Option<String>,
    /// Latest AUTH payment response; each authorize call replaces it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_payload: Option<Value>,
    /// Last processor payload seen for this mandate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_cf_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_manage_action: Option<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl MandateRecord {
    /// True once the processor has assigned an id to this mandate.
    pub fn has_processor_subscription(&self) -> bool {
        self.subscription_id.is_some() || self.cf_subscription_id.is_some()
    }

    /// True when authorization already went through.
    pub fn is_authorized(&self) -> bool {
        self.auth_status == Some(AuthStatus::Success)
            || self.subscription_status == Some(SubscriptionStatus::Active)
    }

    /// The id to quote to the processor for subscription-scoped calls.
    pub fn processor_subscription_id(&self) -> Option<&str> {
        self.subscription_id
            .as_deref()
            .or(self.local_id.as_deref())
    }
}

/// Stored enrollment document, as far as payments are concerned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentRecord {
    /// Cumulative amount collected through CHARGE payments.
    pub paid_amount_minor: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<Timestamp>,
}
