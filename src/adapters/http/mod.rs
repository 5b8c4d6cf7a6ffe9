//! HTTP adapters - REST API implementations.
//!
//! Each area has its own module with dto, handlers and routes. `api_router`
//! assembles them and applies bearer-token auth to everything except the
//! health, webhook and onboarding callback routes.

pub mod error;
pub mod mandate;
pub mod middleware;
pub mod onboarding;

use axum::{routing::get, Router};

pub use error::{ApiError, ErrorResponse};
pub use mandate::{mandate_routes, webhook_routes, MandateAppState};
pub use middleware::{auth_middleware, AuthState, RequireAuth};
pub use onboarding::{onboarding_public_routes, onboarding_routes, OnboardingAppState};

async fn health() -> &'static str {
    "ok"
}

/// Builds the complete API.
pub fn api_router(
    mandates: MandateAppState,
    onboarding: OnboardingAppState,
    auth: AuthState,
) -> Router {
    let protected = Router::new()
        .nest("/mandate", mandate_routes().with_state(mandates.clone()))
        .merge(onboarding_routes().with_state(onboarding.clone()))
        .layer(axum::middleware::from_fn_with_state(auth, auth_middleware));

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .merge(webhook_routes().with_state(mandates))
        .merge(onboarding_public_routes().with_state(onboarding))
        .merge(protected)
}
