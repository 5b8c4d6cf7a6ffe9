//! HTTP DTOs for merchant onboarding endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::handlers::onboarding::{
    CreateOnboardingLinkResult, MerchantStatusView, OnboardMerchantResult,
};
use crate::domain::merchant::OnboardingLinkType;

/// Request to create a sub-merchant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardMerchantRequest {
    /// Defaults to the authenticated caller.
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    /// Forwarded to the processor unchanged.
    #[serde(alias = "merchant_info")]
    pub merchant_info: Value,
}

/// Request for an onboarding link.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingLinkRequest {
    #[serde(default, alias = "merchant_id")]
    pub merchant_id: Option<String>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default, alias = "link_type")]
    pub link_type: OnboardingLinkType,
    #[serde(default, alias = "return_url")]
    pub return_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnboardMerchantResponse {
    pub ok: bool,
    pub merchant_id: String,
    pub onboarding_status: String,
    pub cf_response: Value,
}

impl From<OnboardMerchantResult> for OnboardMerchantResponse {
    fn from(result: OnboardMerchantResult) -> Self {
        Self {
            ok: true,
            merchant_id: result.merchant_id,
            onboarding_status: result.onboarding_status,
            cf_response: result.response,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OnboardingLinkResponse {
    pub ok: bool,
    pub merchant_id: String,
    pub cf_response: Value,
}

impl From<CreateOnboardingLinkResult> for OnboardingLinkResponse {
    fn from(result: CreateOnboardingLinkResult) -> Self {
        Self {
            ok: true,
            merchant_id: result.merchant_id,
            cf_response: result.response,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MerchantStatusResponse {
    pub merchant_id: String,
    pub onboarding_status: String,
    pub cf_response: Value,
}

impl From<MerchantStatusView> for MerchantStatusResponse {
    fn from(view: MerchantStatusView) -> Self {
        Self {
            merchant_id: view.merchant_id,
            onboarding_status: view.onboarding_status,
            cf_response: view.response,
        }
    }
}
