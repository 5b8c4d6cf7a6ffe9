//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations over the
//! ports and the shared services.

pub mod mandate;
pub mod onboarding;

pub use mandate::{
    AuthorizeMandateCommand, AuthorizeMandateHandler, AuthorizeMandateResult, CreateMandateCommand,
    CreateMandateHandler, CreateMandateResult, ManageMandateCommand, ManageMandateHandler,
    ManageMandateResult, ReconcileOutcome, WebhookReconciler,
};
pub use onboarding::{
    CreateOnboardingLinkCommand, CreateOnboardingLinkHandler, CreateOnboardingLinkResult,
    GetMerchantStatusHandler, GetMerchantStatusQuery, MerchantStatusView, OnboardMerchantCommand,
    OnboardMerchantHandler, OnboardMerchantResult,
};
