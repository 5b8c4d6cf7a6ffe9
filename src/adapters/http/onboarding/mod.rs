//! HTTP adapter for merchant onboarding endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::OnboardingAppState;
pub use routes::{onboarding_public_routes, onboarding_routes};
