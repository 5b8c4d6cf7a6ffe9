//! Webhook error types for processor notification handling.
//!
//! Verification failures are reported to the transport as 401. Anything that
//! goes wrong after verification is absorbed by the reconciler and only
//! shows up in the audit trail.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur while verifying or parsing a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// No signing secret configured; every delivery is rejected.
    #[error("Webhook secret not configured")]
    SecretNotConfigured,

    /// Signature or timestamp header absent.
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// Raw body absent.
    #[error("Missing body")]
    MissingBody,

    /// Timestamp header is not a number.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Timestamp outside the tolerance window, in either direction.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signature does not match the body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is not a JSON object of the expected envelope.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

impl WebhookError {
    /// True for failures of the authenticity checks.
    pub fn is_verification_failure(&self) -> bool {
        !matches!(self, WebhookError::ParseError(_) | WebhookError::MissingField(_))
    }

    /// Maps the error to the status returned to the sender.
    pub fn status_code(&self) -> StatusCode {
        if self.is_verification_failure() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_missing_header_name() {
        let err = WebhookError::MissingHeader("x-webhook-signature");
        assert_eq!(err.to_string(), "Missing header: x-webhook-signature");
    }

    #[test]
    fn verification_failures_map_to_unauthorized() {
        for err in [
            WebhookError::SecretNotConfigured,
            WebhookError::MissingBody,
            WebhookError::InvalidTimestamp,
            WebhookError::TimestampOutOfRange,
            WebhookError::InvalidSignature,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{}", err);
        }
    }

    #[test]
    fn payload_errors_map_to_bad_request() {
        assert_eq!(
            WebhookError::ParseError("not json".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(WebhookError::MissingField("type").status_code(), StatusCode::BAD_REQUEST);
    }
}
