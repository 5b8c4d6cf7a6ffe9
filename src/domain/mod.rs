//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `mandate` - Mandate lifecycle, payments, webhook verification and parsing
//! - `merchant` - Merchant onboarding records

pub mod foundation;
pub mod mandate;
pub mod merchant;
