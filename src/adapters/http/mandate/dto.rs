//! HTTP DTOs for mandate endpoints.
//!
//! Request bodies use camelCase keys as sent by existing clients; the nested
//! processor objects (`customer_details`, `payment_method`) keep the
//! processor's snake_case.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::handlers::mandate::{
    AuthorizeMandateResult, CreateMandateResult, ManageMandateResult,
};
use crate::domain::mandate::{
    CustomerDetails, IntervalType, PaymentMethod, PlanDetails, Schedule, SubscriptionTerms,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to create a mandate for an enrollment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMandateRequest {
    #[serde(alias = "merchant_id")]
    pub merchant_id: String,
    #[serde(alias = "enrollment_id")]
    pub enrollment_id: String,
    /// Defaults to the authenticated caller.
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default, alias = "plan_id")]
    pub plan_id: Option<String>,
    #[serde(default, alias = "plan_name")]
    pub plan_name: Option<String>,
    /// Amount per cycle in major units.
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default, alias = "max_amount")]
    pub max_amount: Option<f64>,
    #[serde(default, alias = "interval_type")]
    pub interval_type: Option<IntervalType>,
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default, alias = "max_cycles")]
    pub max_cycles: Option<u32>,
    #[serde(default, rename = "customer_details", alias = "customerDetails")]
    pub customer_details: CustomerDetails,
    #[serde(default, alias = "first_charge_time")]
    pub first_charge_time: Option<String>,
    #[serde(default, alias = "expiry_time")]
    pub expiry_time: Option<String>,
    #[serde(default, rename = "return_url", alias = "returnUrl")]
    pub return_url: Option<String>,
}

impl CreateMandateRequest {
    pub fn terms(&self) -> SubscriptionTerms {
        let defaults = PlanDetails::default();
        SubscriptionTerms {
            customer: self.customer_details.clone(),
            plan: PlanDetails {
                plan_id: self.plan_id.clone(),
                plan_name: self.plan_name.clone(),
                amount: self.amount,
                max_amount: self.max_amount,
                interval_type: self.interval_type.unwrap_or(defaults.interval_type),
                intervals: self.interval.unwrap_or(defaults.intervals),
                max_cycles: self.max_cycles,
            },
            schedule: Schedule {
                first_charge_time: self.first_charge_time.clone(),
                expiry_time: self.expiry_time.clone(),
            },
            return_url: self.return_url.clone(),
        }
    }
}

/// Request to raise the authorization payment for a created mandate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeMandateRequest {
    #[serde(alias = "enrollment_id")]
    pub enrollment_id: String,
    #[serde(default, rename = "payment_method", alias = "paymentMethod")]
    pub payment_method: PaymentMethod,
}

/// Request to cancel, pause or activate a mandate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageMandateRequest {
    #[serde(alias = "merchant_id")]
    pub merchant_id: String,
    /// CANCEL, PAUSE or ACTIVATE.
    pub action: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CreateMandateResponse {
    pub ok: bool,
    pub mandate_id: String,
    pub subscription_id: String,
    pub cf_subscription_id: Option<String>,
    pub subscription_session_id: Option<String>,
    pub status: String,
    pub cf_response: Value,
}

impl From<CreateMandateResult> for CreateMandateResponse {
    fn from(result: CreateMandateResult) -> Self {
        Self {
            ok: true,
            mandate_id: result.mandate_id.to_string(),
            subscription_id: result.subscription_id,
            cf_subscription_id: result.cf_subscription_id,
            subscription_session_id: result.subscription_session_id,
            status: result.status.to_string(),
            cf_response: result.response,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeMandateResponse {
    pub ok: bool,
    pub mandate_id: String,
    pub payment_id: String,
    pub auth_status: String,
    pub cf_response: Value,
}

impl From<AuthorizeMandateResult> for AuthorizeMandateResponse {
    fn from(result: AuthorizeMandateResult) -> Self {
        Self {
            ok: true,
            mandate_id: result.mandate_id.to_string(),
            payment_id: result.payment_id,
            auth_status: result.auth_status.to_string(),
            cf_response: result.response,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManageMandateResponse {
    pub ok: bool,
    pub mandate_id: String,
    /// What happened to the stored status.
    pub outcome: String,
    pub cf_response: Value,
}

impl From<ManageMandateResult> for ManageMandateResponse {
    fn from(result: ManageMandateResult) -> Self {
        Self {
            ok: true,
            mandate_id: result.mandate_id,
            outcome: result.outcome.label().to_string(),
            cf_response: result.response,
        }
    }
}

/// Webhook acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
    pub outcome: String,
}
