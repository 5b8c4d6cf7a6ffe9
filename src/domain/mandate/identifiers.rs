//! Identifier extraction from processor payloads.
//!
//! Payload shapes differ between API versions, so every value is looked up
//! through an ordered list of paths. The first path that yields a non-empty
//! value wins. Numeric values are rendered as strings.

use serde_json::Value;

/// Ordered candidate paths for one logical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldPaths(&'static [&'static [&'static str]]);

impl FieldPaths {
    pub const fn new(paths: &'static [&'static [&'static str]]) -> Self {
        Self(paths)
    }

    /// Returns the first non-empty string found along the paths.
    pub fn extract(&self, payload: &Value) -> Option<String> {
        self.0.iter().find_map(|path| lookup(payload, path).and_then(as_identifier))
    }

    /// Returns the first numeric value found along the paths.
    ///
    /// Strings holding numbers are accepted, as some payloads quote amounts.
    pub fn extract_f64(&self, payload: &Value) -> Option<f64> {
        self.0.iter().find_map(|path| {
            lookup(payload, path).and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
        })
    }
}

fn lookup<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(payload, |node, key| node.get(*key))
}

fn as_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Merchant-supplied subscription id.
pub const SUBSCRIPTION_ID: FieldPaths = FieldPaths::new(&[
    &["data", "subscription_details", "subscription_id"],
    &["data", "subscription_id"],
    &["data", "subscriptionId"],
    &["data", "subscription", "id"],
]);

/// Processor-internal subscription id.
pub const CF_SUBSCRIPTION_ID: FieldPaths = FieldPaths::new(&[
    &["data", "subscription_details", "cf_subscription_id"],
    &["data", "cf_subscription_id"],
    &["data", "cfSubscriptionId"],
]);

/// Subscription status carried by status and auth notifications.
pub const SUBSCRIPTION_STATUS: FieldPaths = FieldPaths::new(&[
    &["data", "subscription_details", "subscription_status"],
    &["data", "subscription_status"],
    &["data", "status"],
]);

pub const NEXT_SCHEDULE_DATE: FieldPaths = FieldPaths::new(&[
    &["data", "subscription_details", "next_schedule_date"],
    &["data", "next_schedule_date"],
]);

pub const PAYMENT_ID: FieldPaths = FieldPaths::new(&[
    &["data", "payment_id"],
    &["data", "payment_details", "payment_id"],
]);

pub const CF_PAYMENT_ID: FieldPaths = FieldPaths::new(&[
    &["data", "cf_payment_id"],
    &["data", "payment_details", "cf_payment_id"],
]);

pub const PAYMENT_TYPE: FieldPaths = FieldPaths::new(&[
    &["data", "payment_type"],
    &["data", "payment_details", "payment_type"],
]);

pub const PAYMENT_STATUS: FieldPaths = FieldPaths::new(&[
    &["data", "payment_status"],
    &["data", "payment_details", "payment_status"],
]);

/// Outcome of the mandate authorization, as reported by auth notifications.
pub const AUTH_STATUS: FieldPaths = FieldPaths::new(&[
    &["data", "authorization_details", "authorization_status"],
    &["data", "payment_status"],
    &["data", "payment_details", "payment_status"],
]);

pub const PAYMENT_AMOUNT: FieldPaths = FieldPaths::new(&[
    &["data", "payment_amount"],
    &["data", "payment_details", "payment_amount"],
    &["data", "amount"],
]);

pub const PAYMENT_CURRENCY: FieldPaths = FieldPaths::new(&[
    &["data", "payment_currency"],
    &["data", "currency"],
]);

pub const FAILURE_REASON: FieldPaths = FieldPaths::new(&[
    &["data", "failure_details", "failure_reason"],
    &["data", "failure_reason"],
]);

pub const REFUND_ID: FieldPaths = FieldPaths::new(&[
    &["data", "refund_details", "refund_id"],
    &["data", "refund_id"],
]);

pub const REFUND_STATUS: FieldPaths = FieldPaths::new(&[
    &["data", "refund_details", "refund_status"],
    &["data", "refund_status"],
]);

pub const REFUND_AMOUNT: FieldPaths = FieldPaths::new(&[
    &["data", "refund_details", "refund_amount"],
    &["data", "refund_amount"],
]);

pub const MERCHANT_ID: FieldPaths = FieldPaths::new(&[
    &["data", "merchant_id"],
    &["data", "merchant", "merchant_id"],
]);

pub const ONBOARDING_STATUS: FieldPaths = FieldPaths::new(&[
    &["data", "onboarding_status"],
    &["data", "kyc_status"],
]);

/// Paths into synchronous API responses, which are flat or wrapped in
/// `data` depending on the endpoint version.
pub mod response {
    use super::FieldPaths;

    pub const SUBSCRIPTION_ID: FieldPaths = FieldPaths::new(&[
        &["subscription_id"],
        &["data", "subscription_id"],
    ]);

    pub const CF_SUBSCRIPTION_ID: FieldPaths = FieldPaths::new(&[
        &["cf_subscription_id"],
        &["data", "cf_subscription_id"],
    ]);

    pub const SUBSCRIPTION_SESSION_ID: FieldPaths = FieldPaths::new(&[
        &["subscription_session_id"],
        &["data", "subscription_session_id"],
    ]);

    pub const SUBSCRIPTION_STATUS: FieldPaths = FieldPaths::new(&[
        &["subscription_status"],
        &["data", "subscription_status"],
        &["status"],
    ]);

    pub const NEXT_SCHEDULE_DATE: FieldPaths = FieldPaths::new(&[
        &["next_schedule_date"],
        &["data", "next_schedule_date"],
    ]);

    pub const PAYMENT_STATUS: FieldPaths = FieldPaths::new(&[
        &["payment_status"],
        &["data", "payment_status"],
    ]);

    pub const ONBOARDING_STATUS: FieldPaths = FieldPaths::new(&[
        &["onboarding_status"],
        &["data", "onboarding_status"],
        &["kyc_status"],
    ]);
}

/// Both subscription identifiers a payload may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionKeys {
    pub subscription_id: Option<String>,
    pub cf_subscription_id: Option<String>,
}

impl SubscriptionKeys {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            subscription_id: SUBSCRIPTION_ID.extract(payload),
            cf_subscription_id: CF_SUBSCRIPTION_ID.extract(payload),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subscription_id.is_none() && self.cf_subscription_id.is_none()
    }

    /// Preferred key for logging: the processor id when known.
    pub fn display_key(&self) -> &str {
        self.cf_subscription_id
            .as_deref()
            .or(self.subscription_id.as_deref())
            .unwrap_or("NA")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_subscription_details_win() {
        let payload = json!({
            "data": {
                "subscription_details": { "subscription_id": "sub_nested" },
                "subscription_id": "sub_flat"
            }
        });

        assert_eq!(SUBSCRIPTION_ID.extract(&payload).as_deref(), Some("sub_nested"));
    }

    #[test]
    fn falls_through_to_camel_case_and_object_forms() {
        let camel = json!({ "data": { "subscriptionId": "sub_camel" } });
        let object = json!({ "data": { "subscription": { "id": "sub_obj" } } });

        assert_eq!(SUBSCRIPTION_ID.extract(&camel).as_deref(), Some("sub_camel"));
        assert_eq!(SUBSCRIPTION_ID.extract(&object).as_deref(), Some("sub_obj"));
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let payload = json!({ "data": { "cf_subscription_id": 1_234_567 } });
        assert_eq!(CF_SUBSCRIPTION_ID.extract(&payload).as_deref(), Some("1234567"));
    }

    #[test]
    fn empty_strings_are_skipped() {
        let payload = json!({
            "data": { "subscription_status": "", "status": "ACTIVE" }
        });
        assert_eq!(SUBSCRIPTION_STATUS.extract(&payload).as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn missing_everywhere_is_none() {
        assert!(SUBSCRIPTION_ID.extract(&json!({ "data": {} })).is_none());
        assert!(SUBSCRIPTION_ID.extract(&json!("not an object")).is_none());
    }

    #[test]
    fn amounts_accept_numbers_and_numeric_strings() {
        assert_eq!(PAYMENT_AMOUNT.extract_f64(&json!({ "data": { "payment_amount": 500 } })), Some(500.0));
        assert_eq!(PAYMENT_AMOUNT.extract_f64(&json!({ "data": { "payment_amount": "499.5" } })), Some(499.5));
        assert_eq!(PAYMENT_AMOUNT.extract_f64(&json!({ "data": { "payment_amount": true } })), None);
    }

    #[test]
    fn onboarding_status_falls_back_to_kyc_status() {
        let payload = json!({ "data": { "merchant_id": "M1", "kyc_status": "ACTIVE" } });
        assert_eq!(ONBOARDING_STATUS.extract(&payload).as_deref(), Some("ACTIVE"));
        assert_eq!(MERCHANT_ID.extract(&payload).as_deref(), Some("M1"));
    }

    #[test]
    fn response_paths_read_flat_and_wrapped_bodies() {
        let flat = json!({ "cf_subscription_id": 42, "subscription_status": "INITIALIZED" });
        let wrapped = json!({ "data": { "subscription_session_id": "sess_1" } });

        assert_eq!(response::CF_SUBSCRIPTION_ID.extract(&flat).as_deref(), Some("42"));
        assert_eq!(response::SUBSCRIPTION_STATUS.extract(&flat).as_deref(), Some("INITIALIZED"));
        assert_eq!(response::SUBSCRIPTION_SESSION_ID.extract(&wrapped).as_deref(), Some("sess_1"));
    }

    #[test]
    fn subscription_keys_prefer_processor_id_for_display() {
        let keys = SubscriptionKeys::from_payload(&json!({
            "data": { "subscription_id": "sub_1", "cf_subscription_id": "cf_1" }
        }));
        assert_eq!(keys.display_key(), "cf_1");
        assert!(!keys.is_empty());
        assert_eq!(SubscriptionKeys::default().display_key(), "NA");
    }
}
