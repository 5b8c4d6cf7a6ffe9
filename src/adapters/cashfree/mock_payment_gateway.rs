//! Mock payment gateway for testing.
//!
//! Provides a configurable mock implementation of `PaymentGateway` for unit
//! and integration tests. Supports:
//! - Queued responses per operation (falling back to canned defaults)
//! - Error injection
//! - Call tracking

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::mandate::ManageAction;
use crate::domain::merchant::OnboardingLinkType;
use crate::ports::{GatewayError, PaymentGateway};

/// Gateway operations, used to key responses and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOperation {
    CreateMerchant,
    CreateOnboardingLink,
    GetMerchant,
    CreateSubscription,
    CreatePayment,
    ManageSubscription,
}

/// Recorded call for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCall {
    pub operation: GatewayOperation,
    pub merchant_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub payload: Value,
}

#[derive(Default)]
struct MockState {
    responses: HashMap<GatewayOperation, VecDeque<Value>>,
    errors: HashMap<GatewayOperation, GatewayError>,
    calls: Vec<GatewayCall>,
}

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.push_response(GatewayOperation::CreateSubscription, json!({ "cf_subscription_id": "cf_1" }));
/// gateway.fail(GatewayOperation::CreatePayment, GatewayError::rejected(400, "bad"));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Queue a response for the next call to `operation`.
    pub fn push_response(&self, operation: GatewayOperation, response: Value) {
        self.inner
            .lock()
            .unwrap()
            .responses
            .entry(operation)
            .or_default()
            .push_back(response);
    }

    /// Make every call to `operation` fail until cleared.
    pub fn fail(&self, operation: GatewayOperation, error: GatewayError) {
        self.inner.lock().unwrap().errors.insert(operation, error);
    }

    pub fn clear_errors(&self) {
        self.inner.lock().unwrap().errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, operation: GatewayOperation) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    pub fn last_call(&self, operation: GatewayOperation) -> Option<GatewayCall> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .rev()
            .find(|call| call.operation == operation)
            .cloned()
    }

    fn record(&self, call: GatewayCall) -> Result<Value, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        let operation = call.operation;
        let default = default_response(&call);
        state.calls.push(call);

        if let Some(err) = state.errors.get(&operation) {
            return Err(err.clone());
        }
        Ok(state
            .responses
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or(default))
    }
}

/// Canned success responses shaped like the processor's.
fn default_response(call: &GatewayCall) -> Value {
    match call.operation {
        GatewayOperation::CreateMerchant => json!({
            "merchant_id": call.payload.get("merchant_id").cloned().unwrap_or_else(|| json!("mock_merchant")),
            "onboarding_status": "CREATED",
        }),
        GatewayOperation::CreateOnboardingLink => json!({
            "onboarding_link": "https://onboarding.example.test/link",
        }),
        GatewayOperation::GetMerchant => json!({
            "merchant_id": call.merchant_id,
            "onboarding_status": "ACTIVE",
        }),
        GatewayOperation::CreateSubscription => {
            let subscription_id = call.payload.get("subscription_id").cloned().unwrap_or(Value::Null);
            json!({
                "subscription_id": subscription_id,
                "cf_subscription_id": format!("cf_{}", subscription_id.as_str().unwrap_or("mock")),
                "subscription_session_id": "session_mock",
                "subscription_status": "INITIALIZED",
            })
        }
        GatewayOperation::CreatePayment => json!({
            "payment_id": call.payload.get("payment_id").cloned().unwrap_or(Value::Null),
            "cf_payment_id": "cf_payment_mock",
            "payment_status": "PENDING",
        }),
        GatewayOperation::ManageSubscription => json!({
            "subscription_id": call.payload.get("subscription_id").cloned().unwrap_or(Value::Null),
        }),
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_merchant(&self, merchant_info: &Value) -> Result<Value, GatewayError> {
        self.record(GatewayCall {
            operation: GatewayOperation::CreateMerchant,
            merchant_id: None,
            idempotency_key: None,
            payload: merchant_info.clone(),
        })
    }

    async fn create_onboarding_link(
        &self,
        merchant_id: &str,
        link_type: OnboardingLinkType,
        return_url: &str,
    ) -> Result<Value, GatewayError> {
        self.record(GatewayCall {
            operation: GatewayOperation::CreateOnboardingLink,
            merchant_id: Some(merchant_id.to_string()),
            idempotency_key: None,
            payload: json!({ "link_type": link_type, "return_url": return_url }),
        })
    }

    async fn get_merchant(&self, merchant_id: &str) -> Result<Value, GatewayError> {
        self.record(GatewayCall {
            operation: GatewayOperation::GetMerchant,
            merchant_id: Some(merchant_id.to_string()),
            idempotency_key: None,
            payload: Value::Null,
        })
    }

    async fn create_subscription(
        &self,
        merchant_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> Result<Value, GatewayError> {
        self.record(GatewayCall {
            operation: GatewayOperation::CreateSubscription,
            merchant_id: Some(merchant_id.to_string()),
            idempotency_key: Some(idempotency_key.to_string()),
            payload: payload.clone(),
        })
    }

    async fn create_payment(
        &self,
        merchant_id: &str,
        payload: &Value,
        idempotency_key: &str,
    ) -> Result<Value, GatewayError> {
        self.record(GatewayCall {
            operation: GatewayOperation::CreatePayment,
            merchant_id: Some(merchant_id.to_string()),
            idempotency_key: Some(idempotency_key.to_string()),
            payload: payload.clone(),
        })
    }

    async fn manage_subscription(
        &self,
        merchant_id: &str,
        subscription_id: &str,
        action: ManageAction,
    ) -> Result<Value, GatewayError> {
        self.record(GatewayCall {
            operation: GatewayOperation::ManageSubscription,
            merchant_id: Some(merchant_id.to_string()),
            idempotency_key: None,
            payload: json!({ "subscription_id": subscription_id, "action": action.as_str() }),
        })
    }
}
