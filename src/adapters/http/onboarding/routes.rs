//! Axum router configuration for onboarding endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_onboarding_link, merchant_status, onboard_merchant, onboarding_callback,
    OnboardingAppState,
};

/// Onboarding routes that require a bearer token.
///
/// - `POST /onboard` - Create a sub-merchant for the user
/// - `POST /onboard/link` - Issue a hosted onboarding link
/// - `GET /debug/merchant/:merchant_id/status` - Live status from the processor
pub fn onboarding_routes() -> Router<OnboardingAppState> {
    Router::new()
        .route("/onboard", post(onboard_merchant))
        .route("/onboard/link", post(create_onboarding_link))
        .route("/debug/merchant/:merchant_id/status", get(merchant_status))
}

/// Public onboarding routes.
///
/// - `GET /onboard/link/callback` - Return target of the hosted flow
pub fn onboarding_public_routes() -> Router<OnboardingAppState> {
    Router::new().route("/onboard/link/callback", get(onboarding_callback))
}
