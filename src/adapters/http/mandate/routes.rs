//! Axum router configuration for mandate endpoints.

use axum::{routing::post, Router};

use super::handlers::{
    authorize_mandate, create_mandate, manage_mandate, receive_webhook, MandateAppState,
};

/// Mandate API routes. Every route requires a bearer token.
///
/// - `POST /create` - Create the processor subscription for an enrollment
/// - `POST /authorize` - Raise the AUTH payment
/// - `POST /:subscription_id/manage` - Cancel, pause or activate
pub fn mandate_routes() -> Router<MandateAppState> {
    Router::new()
        .route("/create", post(create_mandate))
        .route("/authorize", post(authorize_mandate))
        .route("/:subscription_id/manage", post(manage_mandate))
}

/// Processor webhook route. No user authentication; the body is signed.
pub fn webhook_routes() -> Router<MandateAppState> {
    Router::new().route("/webhook", post(receive_webhook))
}
