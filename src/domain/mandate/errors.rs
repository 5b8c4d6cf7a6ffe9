//! Mandate-specific error types.
//!
//! Request-time failures of mandate and onboarding operations.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | ValidationFailed | 400 |
//! | Unauthorized | 401 |
//! | NotFound | 404 |
//! | Conflict | 409 |
//! | InvalidState | 422 |
//! | Upstream | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Mandate-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MandateError {
    /// A required field is missing or malformed.
    ValidationFailed { field: String, message: String },

    /// Duplicate creation or double authorization.
    Conflict(String),

    /// Missing or invalid credentials.
    Unauthorized(String),

    /// Mandate, merchant or payment lookup failed.
    NotFound(String),

    /// The mandate is not in a state that allows the operation.
    InvalidState { current: String, attempted: String },

    /// The payment processor failed or answered with a non-success status.
    Upstream { status: Option<u16>, message: String },

    /// Datastore or other infrastructure failure.
    Infrastructure(String),
}

impl MandateError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MandateError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        MandateError::Conflict(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        MandateError::Unauthorized(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        MandateError::NotFound(what.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        MandateError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        MandateError::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        MandateError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MandateError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            MandateError::Conflict(_) => ErrorCode::Conflict,
            MandateError::Unauthorized(_) => ErrorCode::Unauthorized,
            MandateError::NotFound(_) => ErrorCode::NotFound,
            MandateError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            MandateError::Upstream { .. } => ErrorCode::UpstreamError,
            MandateError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            MandateError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            MandateError::Conflict(msg) => msg.clone(),
            MandateError::Unauthorized(msg) => format!("Unauthorized: {}", msg),
            MandateError::NotFound(what) => format!("Not found: {}", what),
            MandateError::InvalidState { current, attempted } => {
                format!("Cannot {} mandate in {} state", attempted, current)
            }
            MandateError::Upstream { status: Some(status), message } => {
                format!("Payment processor error ({}): {}", status, message)
            }
            MandateError::Upstream { status: None, message } => {
                format!("Payment processor error: {}", message)
            }
            MandateError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if repeating the same request may succeed.
    ///
    /// Validation, conflict and state errors need the caller to change
    /// something first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MandateError::Upstream { .. } | MandateError::Infrastructure(_)
        )
    }
}

impl std::fmt::Display for MandateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for MandateError {}

impl From<DomainError> for MandateError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => MandateError::ValidationFailed {
                field: err.detail("field").unwrap_or("unknown").to_string(),
                message: err.message,
            },
            ErrorCode::NotFound => MandateError::NotFound(err.message),
            ErrorCode::Conflict => MandateError::Conflict(err.message),
            ErrorCode::Unauthorized => MandateError::Unauthorized(err.message),
            _ => MandateError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for MandateError {
    fn from(err: ValidationError) -> Self {
        MandateError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<MandateError> for DomainError {
    fn from(err: MandateError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_field() {
        let err = MandateError::validation("customer_email", "is required");
        assert_eq!(err.message(), "Validation failed for 'customer_email': is required");
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn invalid_state_message_reads_naturally() {
        let err = MandateError::invalid_state("INITIALIZED", "authorize");
        assert_eq!(err.to_string(), "Cannot authorize mandate in INITIALIZED state");
    }

    #[test]
    fn upstream_message_includes_status_when_known() {
        let err = MandateError::upstream(Some(409), "subscription exists");
        assert_eq!(err.message(), "Payment processor error (409): subscription exists");

        let err = MandateError::upstream(None, "timed out");
        assert_eq!(err.message(), "Payment processor error: timed out");
    }

    #[test]
    fn only_upstream_and_infrastructure_are_retryable() {
        assert!(MandateError::upstream(None, "x").is_retryable());
        assert!(MandateError::infrastructure("x").is_retryable());
        assert!(!MandateError::conflict("x").is_retryable());
        assert!(!MandateError::validation("f", "x").is_retryable());
        assert!(!MandateError::not_found("x").is_retryable());
    }

    #[test]
    fn database_errors_become_infrastructure() {
        let err: MandateError = DomainError::database("connection reset").into();
        assert!(matches!(err, MandateError::Infrastructure(_)));
    }

    #[test]
    fn domain_validation_errors_keep_field() {
        let err: MandateError = DomainError::validation("plan_amount", "must be positive").into();
        assert_eq!(
            err,
            MandateError::ValidationFailed {
                field: "plan_amount".to_string(),
                message: "must be positive".to_string()
            }
        );
    }

    #[test]
    fn value_object_errors_convert_to_validation_failures() {
        let err: MandateError = ValidationError::empty_field("enrollment_id").into();
        assert!(matches!(err, MandateError::ValidationFailed { ref field, .. } if field == "enrollment_id"));
    }
}
