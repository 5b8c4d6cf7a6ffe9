//! Error responses shared by every API route.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::domain::foundation::{DomainError, ValidationError};
use crate::domain::mandate::MandateError;

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// API error type that converts request-time errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub MandateError);

impl From<MandateError> for ApiError {
    fn from(err: MandateError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(MandateError::from(err))
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(MandateError::from(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MandateError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            MandateError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MandateError::NotFound(_) => StatusCode::NOT_FOUND,
            MandateError::Conflict(_) => StatusCode::CONFLICT,
            MandateError::InvalidState { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            MandateError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            MandateError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.0.code().to_string();
        let message = self.0.message();

        if status.is_server_error() {
            tracing::error!(error_code = %error_code, reason = %message, "Request failed");
        } else {
            tracing::debug!(error_code = %error_code, reason = %message, "Request rejected");
        }

        let body = match &self.0 {
            MandateError::ValidationFailed { field, .. } => {
                ErrorResponse::with_details(error_code, message, json!({ "field": field }))
            }
            MandateError::Upstream {
                status: Some(upstream),
                ..
            } => ErrorResponse::with_details(
                error_code,
                message,
                json!({ "upstream_status": upstream }),
            ),
            _ => ErrorResponse::new(error_code, message),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_mapping_follows_error_kind() {
        let cases = [
            (MandateError::validation("amount", "required"), 400),
            (MandateError::unauthorized("no token"), 401),
            (MandateError::not_found("mandate"), 404),
            (MandateError::conflict("exists"), 409),
            (MandateError::invalid_state("COMPLETED", "authorize"), 422),
            (MandateError::upstream(Some(500), "boom"), 502),
            (MandateError::infrastructure("db down"), 500),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status().as_u16(), expected);
        }
    }

    #[tokio::test]
    async fn upstream_error_carries_processor_status() {
        let response = ApiError(MandateError::upstream(Some(409), "duplicate")).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["details"]["upstream_status"], 409);
    }

    #[tokio::test]
    async fn validation_error_names_field() {
        let response = ApiError(MandateError::validation("enrollmentId", "is required")).into_response();

        let body = body_json(response).await;
        assert_eq!(body["details"]["field"], "enrollmentId");
        assert!(body["message"].as_str().unwrap().contains("enrollmentId"));
    }

    #[test]
    fn error_response_omits_missing_details() {
        let json = serde_json::to_string(&ErrorResponse::new("NOT_FOUND", "Not found")).unwrap();
        assert!(!json.contains("details"));
    }
}
