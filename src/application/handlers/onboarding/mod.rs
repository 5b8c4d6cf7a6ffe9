//! Merchant onboarding handlers.

mod create_onboarding_link;
mod get_merchant_status;
mod onboard_merchant;

pub use create_onboarding_link::{
    CreateOnboardingLinkCommand, CreateOnboardingLinkHandler, CreateOnboardingLinkResult,
};
pub use get_merchant_status::{GetMerchantStatusHandler, GetMerchantStatusQuery, MerchantStatusView};
pub use onboard_merchant::{OnboardMerchantCommand, OnboardMerchantHandler, OnboardMerchantResult};
