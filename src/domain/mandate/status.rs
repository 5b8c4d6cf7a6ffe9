//! Mandate status state machine.
//!
//! `SubscriptionStatus` is the processor-side lifecycle of a mandate and the
//! single authoritative transition table consulted by every mutation path
//! (creation, manage calls, webhooks). `AuthStatus` tracks the out-of-band
//! authorization payment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Processor-side subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Created at the processor, not yet presented to the bank.
    Initialized,

    /// Authorization submitted, awaiting the customer's bank.
    BankApprovalPending,

    /// Authorized; charges are being collected.
    Active,

    /// Temporarily paused.
    OnHold,

    /// All scheduled charges collected.
    Completed,

    /// Cancelled by the customer from their bank or UPI app.
    CustomerCancelled,

    /// Cancelled by the merchant before or while paused.
    Cancelled,

    /// Lapsed past its expiry time.
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Initialized => "INITIALIZED",
            SubscriptionStatus::BankApprovalPending => "BANK_APPROVAL_PENDING",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::OnHold => "ON_HOLD",
            SubscriptionStatus::Completed => "COMPLETED",
            SubscriptionStatus::CustomerCancelled => "CUSTOMER_CANCELLED",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INITIALIZED" => Ok(SubscriptionStatus::Initialized),
            "BANK_APPROVAL_PENDING" => Ok(SubscriptionStatus::BankApprovalPending),
            "ACTIVE" => Ok(SubscriptionStatus::Active),
            "ON_HOLD" => Ok(SubscriptionStatus::OnHold),
            "COMPLETED" => Ok(SubscriptionStatus::Completed),
            "CUSTOMER_CANCELLED" => Ok(SubscriptionStatus::CustomerCancelled),
            "CANCELLED" => Ok(SubscriptionStatus::Cancelled),
            "EXPIRED" => Ok(SubscriptionStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From INITIALIZED
            (Initialized, BankApprovalPending)
                | (Initialized, Cancelled)
            // From BANK_APPROVAL_PENDING
                | (BankApprovalPending, Active)
                | (BankApprovalPending, Cancelled)
            // From ACTIVE
                | (Active, OnHold)
                | (Active, Completed)
                | (Active, CustomerCancelled)
                | (Active, Expired)
            // From ON_HOLD
                | (OnHold, Active)
                | (OnHold, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Initialized => vec![BankApprovalPending, Cancelled],
            BankApprovalPending => vec![Active, Cancelled],
            Active => vec![OnHold, Completed, CustomerCancelled, Expired],
            OnHold => vec![Active, Cancelled],
            Completed | CustomerCancelled | Cancelled | Expired => vec![],
        }
    }
}

/// How a requested status relates to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The pair is in the transition table, or there is no prior status.
    Transition,
    /// Same non-terminal status repeated; metadata may still be refreshed.
    Refresh,
    /// Not allowed; the whole update is dropped.
    Rejected,
}

impl SubscriptionStatus {
    /// Classifies a requested move from `current` to `target`.
    pub fn evaluate(current: Option<SubscriptionStatus>, target: SubscriptionStatus) -> StatusChange {
        match current {
            Some(current) if current == target && !current.is_terminal() => StatusChange::Refresh,
            current if Self::admits(current.as_ref(), &target) => StatusChange::Transition,
            _ => StatusChange::Rejected,
        }
    }
}

/// Status of the authorization (AUTH) payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

impl AuthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Pending => "PENDING",
            AuthStatus::Success => "SUCCESS",
            AuthStatus::Failed => "FAILED",
            AuthStatus::Cancelled => "CANCELLED",
        }
    }

    /// Maps a processor payment status onto an authorization status.
    ///
    /// Anything the processor has not finalised counts as pending.
    pub fn from_payment_status(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" | "ACTIVE" => AuthStatus::Success,
            "FAILED" => AuthStatus::Failed,
            "CANCELLED" | "VOID" => AuthStatus::Cancelled,
            _ => AuthStatus::Pending,
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
