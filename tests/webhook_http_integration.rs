//! Integration tests for the HTTP surface.
//!
//! These tests drive the assembled router with in-memory adapters:
//! 1. Bearer-token protected mandate routes
//! 2. Signed processor webhooks and their acknowledgements
//! 3. Error bodies for refused requests

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use mandate_gateway::adapters::auth::MockSessionValidator;
use mandate_gateway::adapters::cashfree::MockPaymentGateway;
use mandate_gateway::adapters::datastore::InMemoryDatastore;
use mandate_gateway::adapters::http::{api_router, MandateAppState, OnboardingAppState};
use mandate_gateway::domain::foundation::Timestamp;
use mandate_gateway::domain::mandate::{compute_signature, SignatureVerifier};
use mandate_gateway::ports::{Collection, Datastore};

const SECRET: &str = "whsec_test";
const TOKEN: &str = "test-token";

// =============================================================================
// Test Infrastructure
// =============================================================================

fn app(datastore: Arc<InMemoryDatastore>) -> Router {
    let gateway = Arc::new(MockPaymentGateway::new());
    api_router(
        MandateAppState {
            datastore: datastore.clone(),
            gateway: gateway.clone(),
            verifier: Arc::new(SignatureVerifier::new(
                Some(SecretString::new(SECRET.to_string())),
                300,
            )),
            audit_namespace: "cashfree".to_string(),
        },
        OnboardingAppState {
            datastore,
            gateway,
            audit_namespace: "cashfree".to_string(),
        },
        Arc::new(MockSessionValidator::new().with_test_user(TOKEN, "uid-1")),
    )
}

fn create_body(enrollment_id: &str) -> Value {
    json!({
        "merchantId": "M1",
        "enrollmentId": enrollment_id,
        "amount": 500,
        "intervalType": "MONTH",
        "firstChargeTime": "2024-07-01T00:00:00Z",
        "customer_details": {
            "name": "Asha",
            "email": "asha@example.com",
            "phone": "9876543210"
        }
    })
}

fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn signed_webhook(body: &Value, secret: &str) -> Request<Body> {
    let raw = body.to_string();
    let timestamp = Timestamp::now().as_unix_secs().to_string();
    let signature = compute_signature(secret, &timestamp, raw.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("x-webhook-signature", signature)
        .header("x-webhook-timestamp", timestamp)
        .body(Body::from(raw))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn create_with_bearer_token_returns_created() {
    let datastore = Arc::new(InMemoryDatastore::new());
    let app = app(datastore.clone());

    let (status, body) = send(&app, post_json("/mandate/create", &create_body("E1"), Some(TOKEN))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ok"], true);
    assert_eq!(body["mandate_id"], "mandate_E1");
    assert_eq!(body["status"], "INITIALIZED");

    let stored = datastore.get(Collection::Mandates, "mandate_E1").await.unwrap().unwrap();
    assert_eq!(stored["userId"], "uid-1");
}

#[tokio::test]
async fn repeated_create_is_a_conflict() {
    let app = app(Arc::new(InMemoryDatastore::new()));
    send(&app, post_json("/mandate/create", &create_body("E1"), Some(TOKEN))).await;

    let (status, body) = send(&app, post_json("/mandate/create", &create_body("E1"), Some(TOKEN))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "CONFLICT");
}

#[tokio::test]
async fn create_without_customer_email_is_a_validation_failure() {
    let app = app(Arc::new(InMemoryDatastore::new()));
    let mut body = create_body("E1");
    body["customer_details"]["email"] = Value::Null;

    let (status, body) = send(&app, post_json("/mandate/create", &body, Some(TOKEN))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["field"], "customer_details.email");
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let app = app(Arc::new(InMemoryDatastore::new()));

    let (status, body) = send(&app, post_json("/mandate/create", &create_body("E1"), Some("wrong"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn signed_payment_webhook_credits_enrollment() {
    let datastore = Arc::new(InMemoryDatastore::new());
    let app = app(datastore.clone());
    let (_, created) = send(&app, post_json("/mandate/create", &create_body("E1"), Some(TOKEN))).await;
    let cf_subscription_id = created["cf_subscription_id"].as_str().unwrap().to_string();

    let webhook = json!({
        "type": "SUBSCRIPTION_PAYMENT_SUCCESS",
        "event_time": "2024-07-01T10:00:00Z",
        "data": {
            "payment_id": "pay_1",
            "payment_type": "CHARGE",
            "payment_status": "SUCCESS",
            "payment_amount": 500,
            "subscription_details": { "cf_subscription_id": cf_subscription_id }
        }
    });

    let (status, body) = send(&app, signed_webhook(&webhook, SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "payment_settled");

    let (status, body) = send(&app, signed_webhook(&webhook, SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "duplicate");

    let enrollment = datastore.get(Collection::Enrollments, "E1").await.unwrap().unwrap();
    assert_eq!(enrollment["paid_amount_minor"], 50_000);
}

#[tokio::test]
async fn webhook_signed_with_wrong_secret_is_refused() {
    let datastore = Arc::new(InMemoryDatastore::new());
    let app = app(datastore.clone());
    let webhook = json!({ "type": "SUBSCRIPTION_STATUS_CHANGED", "data": {} });

    let (status, body) = send(&app, signed_webhook(&webhook, "not-the-secret")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "INVALID_SIGNATURE");
    assert_eq!(datastore.count(Collection::WebhookEvents).await, 0);
}

#[tokio::test]
async fn webhook_for_unknown_subscription_is_acknowledged() {
    let app = app(Arc::new(InMemoryDatastore::new()));
    let webhook = json!({
        "type": "SUBSCRIPTION_STATUS_CHANGED",
        "event_time": "2024-06-01T10:00:00Z",
        "data": { "subscription_details": { "cf_subscription_id": "cf_unknown", "subscription_status": "ACTIVE" } }
    });

    let (status, body) = send(&app, signed_webhook(&webhook, SECRET)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "unresolved");
}
