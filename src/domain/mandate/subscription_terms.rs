//! Customer, plan and scheduling terms of a mandate.
//!
//! These are the validated inputs of mandate creation and authorization.
//! Each knows how to render itself into the processor's request body.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::status::SubscriptionStatus;
use crate::domain::foundation::ValidationError;

/// Amount charged by the authorization payment, in major units.
pub const AUTH_PAYMENT_AMOUNT: f64 = 1.0;

/// Customer contact details. Email and phone are required by the processor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerDetails {
    #[serde(alias = "customer_name")]
    pub name: Option<String>,
    #[serde(alias = "customer_email")]
    pub email: Option<String>,
    #[serde(alias = "customer_phone")]
    pub phone: Option<String>,
}

impl CustomerDetails {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let email = required(&self.email, "customer_details.email")?;
        if !email.contains('@') {
            return Err(ValidationError::invalid_format(
                "customer_details.email",
                "must be an email address",
            ));
        }
        let phone = required(&self.phone, "customer_details.phone")?;
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if digits < 10 || !phone.chars().all(|c| c.is_ascii_digit() || c == '+' || c == ' ') {
            return Err(ValidationError::invalid_format(
                "customer_details.phone",
                "must contain at least 10 digits",
            ));
        }
        Ok(())
    }

    fn to_payload(&self) -> Value {
        let mut body = Map::new();
        if let Some(name) = &self.name {
            body.insert("customer_name".to_string(), json!(name));
        }
        if let Some(email) = &self.email {
            body.insert("customer_email".to_string(), json!(email.trim()));
        }
        if let Some(phone) = &self.phone {
            body.insert("customer_phone".to_string(), json!(phone.trim()));
        }
        Value::Object(body)
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::empty_field(field))
}

/// Charge interval unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IntervalType {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl IntervalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalType::Day => "DAY",
            IntervalType::Week => "WEEK",
            IntervalType::Month => "MONTH",
            IntervalType::Year => "YEAR",
        }
    }
}

impl FromStr for IntervalType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAY" | "DAILY" => Ok(IntervalType::Day),
            "WEEK" | "WEEKLY" => Ok(IntervalType::Week),
            "MONTH" | "MONTHLY" => Ok(IntervalType::Month),
            "YEAR" | "YEARLY" => Ok(IntervalType::Year),
            other => Err(ValidationError::invalid_format(
                "plan.interval_type",
                format!("unknown interval '{}'", other),
            )),
        }
    }
}

impl TryFrom<String> for IntervalType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IntervalType> for String {
    fn from(value: IntervalType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for IntervalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_intervals() -> u32 {
    1
}

/// Plan terms: either a pre-registered `plan_id` or inline amount details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDetails {
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,
    #[serde(default)]
    pub interval_type: IntervalType,
    #[serde(default = "default_intervals")]
    pub intervals: u32,
    #[serde(default)]
    pub max_cycles: Option<u32>,
}

impl Default for PlanDetails {
    fn default() -> Self {
        Self {
            plan_id: None,
            plan_name: None,
            amount: None,
            max_amount: None,
            interval_type: IntervalType::default(),
            intervals: default_intervals(),
            max_cycles: None,
        }
    }
}

impl PlanDetails {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_plan_id = self.plan_id.as_deref().is_some_and(|id| !id.trim().is_empty());
        match self.amount {
            Some(amount) if !amount.is_finite() || amount <= 0.0 => {
                return Err(ValidationError::invalid_format("plan.amount", "must be positive"));
            }
            None if !has_plan_id => return Err(ValidationError::empty_field("plan.amount")),
            _ => {}
        }
        if let (Some(max), Some(amount)) = (self.max_amount, self.amount) {
            if max < amount {
                return Err(ValidationError::invalid_format(
                    "plan.max_amount",
                    "must not be below plan amount",
                ));
            }
        }
        if self.intervals == 0 {
            return Err(ValidationError::out_of_range("plan.intervals", 1, i64::from(u32::MAX), 0));
        }
        Ok(())
    }

    fn to_payload(&self) -> Value {
        let mut body = Map::new();
        if let Some(plan_id) = &self.plan_id {
            body.insert("plan_id".to_string(), json!(plan_id));
        }
        if let Some(amount) = self.amount {
            let name = self
                .plan_name
                .clone()
                .unwrap_or_else(|| format!("{} {}", self.intervals, self.interval_type));
            body.insert("plan_name".to_string(), json!(name));
            body.insert("plan_type".to_string(), json!("PERIODIC"));
            body.insert("plan_amount".to_string(), json!(amount));
            body.insert("plan_max_amount".to_string(), json!(self.max_amount.unwrap_or(amount)));
            body.insert("plan_interval_type".to_string(), json!(self.interval_type.as_str()));
            body.insert("plan_intervals".to_string(), json!(self.intervals));
            body.insert("plan_currency".to_string(), json!(super::payment::DEFAULT_CURRENCY));
            if let Some(cycles) = self.max_cycles {
                body.insert("plan_max_cycles".to_string(), json!(cycles));
            }
        }
        Value::Object(body)
    }
}

/// When charging starts and when the mandate lapses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub first_charge_time: Option<String>,
    pub expiry_time: Option<String>,
}

impl Schedule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("scheduling.first_charge_time", &self.first_charge_time),
            ("scheduling.expiry_time", &self.expiry_time),
        ] {
            if let Some(raw) = value {
                chrono::DateTime::parse_from_rfc3339(raw.trim()).map_err(|_| {
                    ValidationError::invalid_format(field, "must be an RFC 3339 timestamp")
                })?;
            }
        }
        Ok(())
    }
}

/// Everything needed to create the remote subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionTerms {
    pub customer: CustomerDetails,
    pub plan: PlanDetails,
    pub schedule: Schedule,
    pub return_url: Option<String>,
}

impl SubscriptionTerms {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.customer.validate()?;
        self.plan.validate()?;
        self.schedule.validate()
    }

    /// Processor request body for subscription creation.
    pub fn to_payload(&self, subscription_id: &str) -> Value {
        let mut body = json!({
            "subscription_id": subscription_id,
            "customer_details": self.customer.to_payload(),
            "plan_details": self.plan.to_payload(),
            "authorization_details": {
                "authorization_amount": AUTH_PAYMENT_AMOUNT,
                "authorization_amount_refund": true,
                "payment_methods": ["upi"]
            },
            "subscription_meta": {
                "return_url": self.return_url.clone().unwrap_or_default()
            }
        });
        if let Some(first) = &self.schedule.first_charge_time {
            body["subscription_first_charge_time"] = json!(first);
        }
        if let Some(expiry) = &self.schedule.expiry_time {
            body["subscription_expiry_time"] = json!(expiry);
        }
        body
    }
}

/// UPI authorization channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpiChannel {
    /// Collect request pushed to the customer's VPA.
    Collect,
    /// Deep link opened in the customer's UPI app.
    #[default]
    Link,
    /// QR code scanned by the customer.
    Qrcode,
}

/// How the customer approves the mandate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Upi {
        #[serde(default)]
        channel: UpiChannel,
        #[serde(default)]
        upi_id: Option<String>,
    },
}

impl PaymentMethod {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            PaymentMethod::Upi { channel: UpiChannel::Collect, upi_id } => {
                let vpa = required(upi_id, "payment_method.upi.upi_id")?;
                if !vpa.contains('@') {
                    return Err(ValidationError::invalid_format(
                        "payment_method.upi.upi_id",
                        "must be a VPA like name@bank",
                    ));
                }
                Ok(())
            }
            PaymentMethod::Upi { .. } => Ok(()),
        }
    }

    pub fn to_payload(&self) -> Value {
        match self {
            PaymentMethod::Upi { channel, upi_id } => {
                let mut upi = json!({ "channel": channel });
                if let Some(vpa) = upi_id {
                    upi["upi_id"] = json!(vpa);
                }
                json!({ "upi": upi })
            }
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Upi {
            channel: UpiChannel::default(),
            upi_id: None,
        }
    }
}

/// Merchant-initiated change to a live mandate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManageAction {
    Cancel,
    Pause,
    Activate,
}

impl ManageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManageAction::Cancel => "CANCEL",
            ManageAction::Pause => "PAUSE",
            ManageAction::Activate => "ACTIVATE",
        }
    }

    /// Status requested when the processor response does not state one.
    pub fn implied_status(&self) -> SubscriptionStatus {
        match self {
            ManageAction::Cancel => SubscriptionStatus::Cancelled,
            ManageAction::Pause => SubscriptionStatus::OnHold,
            ManageAction::Activate => SubscriptionStatus::Active,
        }
    }
}

impl FromStr for ManageAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CANCEL" => Ok(ManageAction::Cancel),
            "PAUSE" => Ok(ManageAction::Pause),
            "ACTIVATE" => Ok(ManageAction::Activate),
            other => Err(ValidationError::invalid_format(
                "action",
                format!("'{}' is not one of CANCEL, PAUSE, ACTIVATE", other),
            )),
        }
    }
}

impl fmt::Display for ManageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerDetails {
        CustomerDetails {
            name: Some("Asha".to_string()),
            email: Some("asha@example.com".to_string()),
            phone: Some("9876543210".to_string()),
        }
    }

    fn monthly(amount: f64) -> PlanDetails {
        PlanDetails {
            amount: Some(amount),
            ..Default::default()
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Customer
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn complete_customer_validates() {
        assert!(customer().validate().is_ok());
    }

    #[test]
    fn customer_requires_email_and_phone() {
        let no_email = CustomerDetails { email: None, ..customer() };
        assert_eq!(
            no_email.validate().unwrap_err().field(),
            "customer_details.email"
        );

        let blank_phone = CustomerDetails { phone: Some("  ".to_string()), ..customer() };
        assert_eq!(
            blank_phone.validate().unwrap_err().field(),
            "customer_details.phone"
        );
    }

    #[test]
    fn customer_rejects_malformed_contacts() {
        let bad_email = CustomerDetails { email: Some("asha".to_string()), ..customer() };
        assert!(bad_email.validate().is_err());

        let short_phone = CustomerDetails { phone: Some("12345".to_string()), ..customer() };
        assert!(short_phone.validate().is_err());
    }

    #[test]
    fn customer_accepts_processor_field_names() {
        let parsed: CustomerDetails = serde_json::from_value(serde_json::json!({
            "customer_email": "a@b.in",
            "customer_phone": "+91 9876543210"
        }))
        .unwrap();
        assert!(parsed.validate().is_ok());
    }

    // ══════════════════════════════════════════════════════════════
    // Plan
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn plan_needs_amount_or_plan_id() {
        assert!(monthly(500.0).validate().is_ok());
        assert!(PlanDetails { plan_id: Some("gold".to_string()), ..Default::default() }
            .validate()
            .is_ok());
        assert_eq!(PlanDetails::default().validate().unwrap_err().field(), "plan.amount");
    }

    #[test]
    fn plan_rejects_non_positive_amounts_and_zero_intervals() {
        assert!(monthly(0.0).validate().is_err());
        assert!(monthly(-5.0).validate().is_err());
        assert!(PlanDetails { intervals: 0, ..monthly(10.0) }.validate().is_err());
    }

    #[test]
    fn max_amount_cannot_undercut_amount() {
        let plan = PlanDetails { max_amount: Some(100.0), ..monthly(500.0) };
        assert_eq!(plan.validate().unwrap_err().field(), "plan.max_amount");
    }

    #[test]
    fn interval_accepts_adjective_forms() {
        assert_eq!("MONTHLY".parse::<IntervalType>().unwrap(), IntervalType::Month);
        assert_eq!("week".parse::<IntervalType>().unwrap(), IntervalType::Week);
        assert!("FORTNIGHT".parse::<IntervalType>().is_err());

        let plan: PlanDetails =
            serde_json::from_value(serde_json::json!({ "amount": 500, "interval_type": "MONTHLY" })).unwrap();
        assert_eq!(plan.interval_type, IntervalType::Month);
        assert_eq!(plan.intervals, 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Payloads
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn subscription_payload_carries_local_id_and_plan() {
        let terms = SubscriptionTerms {
            customer: customer(),
            plan: monthly(500.0),
            schedule: Schedule {
                first_charge_time: Some("2024-07-01T10:00:00+05:30".to_string()),
                expiry_time: None,
            },
            return_url: Some("https://app.example.com/done".to_string()),
        };

        let body = terms.to_payload("sub_local");

        assert_eq!(body["subscription_id"], "sub_local");
        assert_eq!(body["plan_details"]["plan_amount"], 500.0);
        assert_eq!(body["plan_details"]["plan_interval_type"], "MONTH");
        assert_eq!(body["customer_details"]["customer_email"], "asha@example.com");
        assert_eq!(body["subscription_first_charge_time"], "2024-07-01T10:00:00+05:30");
        assert!(body.get("subscription_expiry_time").is_none());
    }

    #[test]
    fn schedule_requires_rfc3339() {
        let schedule = Schedule {
            first_charge_time: Some("tomorrow".to_string()),
            expiry_time: None,
        };
        assert_eq!(schedule.validate().unwrap_err().field(), "scheduling.first_charge_time");
    }

    #[test]
    fn collect_channel_requires_vpa() {
        let method = PaymentMethod::Upi { channel: UpiChannel::Collect, upi_id: None };
        assert!(method.validate().is_err());

        let method = PaymentMethod::Upi {
            channel: UpiChannel::Collect,
            upi_id: Some("asha@upi".to_string()),
        };
        assert!(method.validate().is_ok());
        assert_eq!(method.to_payload()["upi"]["upi_id"], "asha@upi");
    }

    #[test]
    fn payment_method_deserializes_from_tagged_json() {
        let method: PaymentMethod =
            serde_json::from_value(serde_json::json!({ "upi": { "channel": "qrcode" } })).unwrap();
        assert_eq!(method, PaymentMethod::Upi { channel: UpiChannel::Qrcode, upi_id: None });
    }

    // ══════════════════════════════════════════════════════════════
    // Manage actions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn manage_actions_imply_statuses() {
        assert_eq!(ManageAction::Cancel.implied_status(), SubscriptionStatus::Cancelled);
        assert_eq!(ManageAction::Pause.implied_status(), SubscriptionStatus::OnHold);
        assert_eq!(ManageAction::Activate.implied_status(), SubscriptionStatus::Active);
    }

    #[test]
    fn manage_action_parses_case_insensitively() {
        assert_eq!("cancel".parse::<ManageAction>().unwrap(), ManageAction::Cancel);
        assert!("DELETE".parse::<ManageAction>().is_err());
    }
}
