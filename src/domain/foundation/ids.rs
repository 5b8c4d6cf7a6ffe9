//! Strongly-typed identifier value objects.
//!
//! Identifiers in this system are opaque strings minted by other parties
//! (the identity provider, the payment processor, the enrollment backend),
//! so each newtype only guarantees non-emptiness.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ValidationError;

/// Prefix of every derived mandate document key.
const MANDATE_ID_PREFIX: &str = "mandate_";

/// Prefix of locally generated subscription ids sent to the processor.
const LOCAL_SUBSCRIPTION_PREFIX: &str = "sub_";

/// Unique identifier for an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Merchant identifier assigned by the processor's partner API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchantId(String);

impl MerchantId {
    /// Creates a new MerchantId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("merchant_id"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enrollment identifier owned by the user-management backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(String);

impl EnrollmentId {
    /// Creates a new EnrollmentId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("enrollment_id"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document key of a mandate.
///
/// Mandates created through this service are keyed `mandate_<enrollmentId>`;
/// mandates first seen through a webhook or manage call are keyed by
/// whatever processor id arrived first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MandateId(String);

impl MandateId {
    /// Wraps an existing document key.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("mandate_id"));
        }
        Ok(Self(id))
    }

    /// Derives the deterministic key for an enrollment's mandate.
    ///
    /// Doubles as the processor idempotency key for subscription creation.
    pub fn for_enrollment(enrollment_id: &EnrollmentId) -> Self {
        Self(format!("{}{}", MANDATE_ID_PREFIX, enrollment_id.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MandateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates a fresh local subscription id (`sub_<uuid>`).
pub fn generate_local_subscription_id() -> String {
    format!("{}{}", LOCAL_SUBSCRIPTION_PREFIX, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rejects_empty_string() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("   ").is_err());
    }

    #[test]
    fn user_id_displays_inner_value() {
        let id = UserId::new("uid-42").unwrap();
        assert_eq!(id.to_string(), "uid-42");
    }

    #[test]
    fn merchant_id_rejects_empty_string() {
        let err = MerchantId::new("").unwrap_err();
        assert_eq!(err, ValidationError::empty_field("merchant_id"));
    }

    #[test]
    fn mandate_id_is_derived_from_enrollment() {
        let enrollment = EnrollmentId::new("E1").unwrap();
        assert_eq!(MandateId::for_enrollment(&enrollment).as_str(), "mandate_E1");
    }

    #[test]
    fn mandate_id_derivation_is_deterministic() {
        let enrollment = EnrollmentId::new("enr-9").unwrap();
        assert_eq!(
            MandateId::for_enrollment(&enrollment),
            MandateId::for_enrollment(&enrollment)
        );
    }

    #[test]
    fn local_subscription_ids_are_prefixed_and_unique() {
        let a = generate_local_subscription_id();
        let b = generate_local_subscription_id();

        assert!(a.starts_with("sub_"));
        assert_ne!(a, b);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = EnrollmentId::new("E1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"E1\"");
    }
}
