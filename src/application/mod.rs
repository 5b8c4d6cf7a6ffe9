//! Application layer - Commands, Queries, and Handlers.
//!
//! Handlers orchestrate domain operations and coordinate between ports.
//! Services hold the persistence concerns several handlers share.

pub mod handlers;
pub mod services;

pub use handlers::{
    // Mandate handlers
    AuthorizeMandateCommand, AuthorizeMandateHandler, AuthorizeMandateResult,
    CreateMandateCommand, CreateMandateHandler, CreateMandateResult,
    ManageMandateCommand, ManageMandateHandler, ManageMandateResult,
    ReconcileOutcome, WebhookReconciler,
    // Onboarding handlers
    CreateOnboardingLinkCommand, CreateOnboardingLinkHandler, CreateOnboardingLinkResult,
    GetMerchantStatusHandler, GetMerchantStatusQuery, MerchantStatusView,
    OnboardMerchantCommand, OnboardMerchantHandler, OnboardMerchantResult,
};
