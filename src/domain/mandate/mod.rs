//! Mandate domain module.
//!
//! Recurring-payment mandates, their payments, and the processor webhooks
//! that drive them.
//!
//! # Module Structure
//!
//! - `aggregate` - Stored mandate and enrollment documents
//! - `status` - SubscriptionStatus state machine and AuthStatus
//! - `payment` - Payment records and money
//! - `subscription_terms` - Validated create/authorize/manage inputs
//! - `identifiers` - Ordered field-path extraction from processor payloads
//! - `webhook_event` - Webhook envelope, event types, dedup key
//! - `webhook_verifier` - Timestamped HMAC signature verification
//! - `audit` - Audit trail event kinds

mod aggregate;
mod audit;
mod errors;
pub mod identifiers;
mod payment;
mod status;
mod subscription_terms;
mod webhook_errors;
mod webhook_event;
mod webhook_verifier;

pub use aggregate::{fields, EnrollmentRecord, MandateRecord};
pub use audit::AuditEventKind;
pub use errors::MandateError;
pub use identifiers::{FieldPaths, SubscriptionKeys};
pub use payment::{Money, PaymentRecord, PaymentStatus, PaymentType, RefundDetails, DEFAULT_CURRENCY};
pub use status::{AuthStatus, StatusChange, SubscriptionStatus};
pub use subscription_terms::{
    CustomerDetails, IntervalType, ManageAction, PaymentMethod, PlanDetails, Schedule,
    SubscriptionTerms, UpiChannel, AUTH_PAYMENT_AMOUNT,
};
pub use webhook_errors::WebhookError;
pub use webhook_event::{GatewayWebhook, PaymentNotification, WebhookEventType};
pub use webhook_verifier::{
    compute_signature, normalize_timestamp, SignatureHeaders, SignatureVerifier,
    DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADERS, TIMESTAMP_HEADERS,
};
