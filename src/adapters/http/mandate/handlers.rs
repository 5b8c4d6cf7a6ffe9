//! HTTP handlers for mandate endpoints.
//!
//! These connect axum routes to the application layer handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::http::error::{ApiError, ErrorResponse};
use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::mandate::{
    AuthorizeMandateCommand, AuthorizeMandateHandler, CreateMandateCommand, CreateMandateHandler,
    ManageMandateCommand, ManageMandateHandler, WebhookReconciler,
};
use crate::application::services::{
    EventLog, IdentifierResolver, MandateLifecycle, MandateStore, MerchantDirectory,
    PaymentLedger, WebhookLedger,
};
use crate::domain::foundation::UserId;
use crate::domain::mandate::{ManageAction, MandateError, SignatureHeaders, SignatureVerifier};
use crate::ports::{Datastore, PaymentGateway};

use super::dto::{
    AuthorizeMandateRequest, AuthorizeMandateResponse, CreateMandateRequest,
    CreateMandateResponse, ManageMandateRequest, ManageMandateResponse, WebhookAck,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for mandate routes. Handlers are built per request from the
/// Arc-wrapped adapters.
#[derive(Clone)]
pub struct MandateAppState {
    pub datastore: Arc<dyn Datastore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub verifier: Arc<SignatureVerifier>,
    /// Prefix of audit event types, e.g. `cashfree`.
    pub audit_namespace: String,
}

impl MandateAppState {
    fn store(&self) -> MandateStore {
        MandateStore::new(self.datastore.clone())
    }

    fn events(&self) -> EventLog {
        EventLog::new(self.datastore.clone(), self.audit_namespace.clone())
    }

    fn lifecycle(&self) -> MandateLifecycle {
        MandateLifecycle::new(self.store(), PaymentLedger::new(self.datastore.clone()))
    }

    pub fn create_handler(&self) -> CreateMandateHandler {
        CreateMandateHandler::new(self.gateway.clone(), self.store(), self.events())
    }

    pub fn authorize_handler(&self) -> AuthorizeMandateHandler {
        AuthorizeMandateHandler::new(self.gateway.clone(), self.store(), self.events())
    }

    pub fn manage_handler(&self) -> ManageMandateHandler {
        ManageMandateHandler::new(
            self.gateway.clone(),
            self.store(),
            IdentifierResolver::new(self.store()),
            self.lifecycle(),
            self.events(),
        )
    }

    pub fn webhook_reconciler(&self) -> WebhookReconciler {
        WebhookReconciler::new(
            self.verifier.clone(),
            IdentifierResolver::new(self.store()),
            self.lifecycle(),
            WebhookLedger::new(self.datastore.clone()),
            MerchantDirectory::new(self.datastore.clone()),
            self.events(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /mandate/create
pub async fn create_mandate(
    State(state): State<MandateAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateMandateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = match request.user_id.as_deref() {
        Some(raw) => UserId::new(raw)?,
        None => user.id,
    };
    let cmd = CreateMandateCommand {
        merchant_id: request.merchant_id.clone(),
        enrollment_id: request.enrollment_id.clone(),
        user_id: Some(user_id),
        terms: request.terms(),
    };

    let result = state.create_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(CreateMandateResponse::from(result))))
}

/// POST /mandate/authorize
pub async fn authorize_mandate(
    State(state): State<MandateAppState>,
    RequireAuth(_user): RequireAuth,
    Json(request): Json<AuthorizeMandateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = AuthorizeMandateCommand {
        enrollment_id: request.enrollment_id,
        payment_method: request.payment_method,
    };

    let result = state.authorize_handler().handle(cmd).await?;

    Ok(Json(AuthorizeMandateResponse::from(result)))
}

/// POST /mandate/:subscription_id/manage
pub async fn manage_mandate(
    State(state): State<MandateAppState>,
    RequireAuth(_user): RequireAuth,
    Path(subscription_id): Path<String>,
    Json(request): Json<ManageMandateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let action = request
        .action
        .parse::<ManageAction>()
        .map_err(MandateError::from)?;
    let cmd = ManageMandateCommand {
        subscription_id,
        merchant_id: request.merchant_id,
        action,
    };

    let result = state.manage_handler().handle(cmd).await?;

    Ok(Json(ManageMandateResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhook - processor notifications, authenticated by signature.
///
/// Only a failed signature check is refused. Everything after verification
/// is acknowledged with 200, including processing failures, which stay out
/// of the dedup ledger and are retried on redelivery.
pub async fn receive_webhook(
    State(state): State<MandateAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = SignatureHeaders::from_header_map(&headers);
    let outcome = state.webhook_reconciler().handle(&signature, &body).await;

    if outcome.is_rejected() {
        let error = ErrorResponse::new("INVALID_SIGNATURE", "Webhook signature verification failed");
        return (StatusCode::UNAUTHORIZED, Json(error)).into_response();
    }

    let ack = WebhookAck {
        ok: true,
        outcome: outcome.label().to_string(),
    };
    (StatusCode::OK, Json(ack)).into_response()
}
