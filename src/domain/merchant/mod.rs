//! Merchant onboarding domain.
//!
//! A merchant is a sub-account created under the partner account. Its
//! onboarding status is mirrored on the owning user's document.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::ValidationError;

/// Status recorded when the processor does not report one.
pub const DEFAULT_ONBOARDING_STATUS: &str = "CREATED";

/// Onboarding link flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnboardingLinkType {
    /// Processor-hosted standard onboarding form.
    Standard,
    /// Embeddable onboarding form.
    #[default]
    Normal,
}

impl OnboardingLinkType {
    /// Path suffix below `/merchants/{id}`.
    pub fn path_suffix(&self) -> &'static str {
        match self {
            OnboardingLinkType::Standard => "onboarding_link/standard",
            OnboardingLinkType::Normal => "onboarding_link",
        }
    }
}

impl FromStr for OnboardingLinkType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(OnboardingLinkType::Standard),
            "" | "normal" | "embedded" => Ok(OnboardingLinkType::Normal),
            other => Err(ValidationError::invalid_format(
                "link_type",
                format!("unknown link type '{}'", other),
            )),
        }
    }
}

/// Merchant link stored on `users/{user_id}` under the `cashfree` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_status: Option<String>,
    /// Raw merchant creation response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Field on the user document that holds the `MerchantLink`.
pub const USER_MERCHANT_FIELD: &str = "cashfree";

/// Stored `merchants/{merchant_id}` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantRecord {
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_status: Option<String>,
}

/// Pulls the merchant id out of a creation response (`data.merchant_id` or
/// top-level `merchant_id`).
pub fn merchant_id_from_response(response: &Value) -> Option<String> {
    response
        .pointer("/data/merchant_id")
        .or_else(|| response.get("merchant_id"))
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
}

/// Pulls the onboarding status out of a creation response, defaulting to
/// `CREATED`.
pub fn onboarding_status_from_response(response: &Value) -> String {
    response
        .pointer("/data/onboarding_status")
        .or_else(|| response.get("onboarding_status"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_ONBOARDING_STATUS)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_type_selects_endpoint() {
        assert_eq!(OnboardingLinkType::Standard.path_suffix(), "onboarding_link/standard");
        assert_eq!(OnboardingLinkType::Normal.path_suffix(), "onboarding_link");
    }

    #[test]
    fn link_type_parses_loosely() {
        assert_eq!("Standard".parse::<OnboardingLinkType>().unwrap(), OnboardingLinkType::Standard);
        assert_eq!("".parse::<OnboardingLinkType>().unwrap(), OnboardingLinkType::Normal);
        assert!("premium".parse::<OnboardingLinkType>().is_err());
    }

    #[test]
    fn merchant_id_read_from_data_or_top_level() {
        assert_eq!(
            merchant_id_from_response(&json!({ "data": { "merchant_id": "M1" } })).as_deref(),
            Some("M1")
        );
        assert_eq!(
            merchant_id_from_response(&json!({ "merchant_id": "M2" })).as_deref(),
            Some("M2")
        );
        assert!(merchant_id_from_response(&json!({ "data": {} })).is_none());
    }

    #[test]
    fn onboarding_status_defaults_to_created() {
        assert_eq!(onboarding_status_from_response(&json!({})), "CREATED");
        assert_eq!(
            onboarding_status_from_response(&json!({ "data": { "onboarding_status": "EMAIL_VERIFIED" } })),
            "EMAIL_VERIFIED"
        );
    }

    #[test]
    fn merchant_link_omits_missing_fields() {
        let link = MerchantLink {
            merchant_id: Some("M1".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(link).unwrap(), json!({ "merchant_id": "M1" }));
    }
}
