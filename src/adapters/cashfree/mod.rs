//! Cashfree payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for the Cashfree partner and PG
//! APIs:
//! - Merchant onboarding (create, onboarding links, status)
//! - Subscription creation and management
//! - Subscription payments (AUTH)
//!
//! # Configuration
//!
//! Built once from `GatewayConfig` at startup. A missing partner key does
//! not abort startup; every call then fails with `NotConfigured`.

mod cashfree_adapter;
mod mock_payment_gateway;

pub use cashfree_adapter::{
    CashfreeConfig, CashfreeEnvironment, CashfreeGatewayAdapter, DEFAULT_PARTNER_API_VERSION,
    DEFAULT_PG_API_VERSION, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use mock_payment_gateway::{GatewayCall, GatewayOperation, MockPaymentGateway};
