//! AuthorizeMandateHandler - Raises the AUTH payment that asks the customer to
//! approve a created mandate.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::application::services::{EventLog, MandateStore};
use crate::domain::foundation::{EnrollmentId, MandateId};
use crate::domain::mandate::{
    fields, identifiers::response, AuditEventKind, AuthStatus, MandateError, MandateRecord,
    PaymentMethod, PaymentType, AUTH_PAYMENT_AMOUNT,
};
use crate::ports::{PaymentGateway, Precondition};

/// Prefix of the deterministic AUTH payment id.
const AUTH_PAYMENT_PREFIX: &str = "auth_";

/// Command to authorize an enrollment's mandate.
#[derive(Debug, Clone)]
pub struct AuthorizeMandateCommand {
    pub enrollment_id: String,
    pub payment_method: PaymentMethod,
}

/// Result of a raised authorization payment.
#[derive(Debug, Clone)]
pub struct AuthorizeMandateResult {
    pub mandate_id: MandateId,
    pub payment_id: String,
    pub auth_status: AuthStatus,
    /// Raw processor response.
    pub response: Value,
}

/// Handler for mandate authorization.
pub struct AuthorizeMandateHandler {
    gateway: Arc<dyn PaymentGateway>,
    store: MandateStore,
    events: EventLog,
}

impl AuthorizeMandateHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, store: MandateStore, events: EventLog) -> Self {
        Self {
            gateway,
            store,
            events,
        }
    }

    pub async fn handle(
        &self,
        cmd: AuthorizeMandateCommand,
    ) -> Result<AuthorizeMandateResult, MandateError> {
        let enrollment_id = EnrollmentId::new(cmd.enrollment_id)?;
        cmd.payment_method.validate()?;
        let mandate_id = MandateId::for_enrollment(&enrollment_id);

        // 1. Load and check the mandate
        let mandate = self
            .store
            .get(mandate_id.as_str())
            .await?
            .ok_or_else(|| MandateError::not_found(format!("mandate for enrollment {}", enrollment_id)))?;
        let record = &mandate.record;
        let state = record
            .subscription_status
            .map_or("UNKNOWN".to_string(), |s| s.to_string());

        let session_id = record
            .subscription_session_id
            .as_deref()
            .ok_or_else(|| MandateError::invalid_state(&state, "authorize (no subscription session)"))?;
        if record.is_authorized() {
            return Err(MandateError::conflict(format!(
                "Mandate {} is already authorized",
                mandate_id
            )));
        }
        let first_charge_time = record
            .first_charge_time
            .as_deref()
            .ok_or_else(|| MandateError::invalid_state(&state, "authorize (no first charge time)"))?;
        let merchant_id = record
            .merchant_id
            .as_deref()
            .ok_or_else(|| MandateError::invalid_state(&state, "authorize (no merchant)"))?;
        let subscription_id = record
            .processor_subscription_id()
            .ok_or_else(|| MandateError::invalid_state(&state, "authorize (no subscription id)"))?;

        // 2. Raise the AUTH payment; the payment id doubles as idempotency key
        let payment_id = format!("{}{}", AUTH_PAYMENT_PREFIX, enrollment_id);
        let payload = json!({
            "subscription_id": subscription_id,
            "subscription_session_id": session_id,
            "payment_id": payment_id,
            "payment_type": PaymentType::Auth.as_str(),
            "payment_amount": AUTH_PAYMENT_AMOUNT,
            "payment_schedule_date": first_charge_time,
            "payment_method": cmd.payment_method.to_payload(),
        });
        let response = self
            .gateway
            .create_payment(merchant_id, &payload, &payment_id)
            .await
            .map_err(|e| {
                tracing::error!(mandate_id = %mandate_id, payment_id = %payment_id, error = %e, "AUTH payment failed");
                MandateError::from(e)
            })?;

        // 3. Keep only the latest attempt's response
        let auth_status = response::PAYMENT_STATUS
            .extract(&response)
            .map(|s| AuthStatus::from_payment_status(&s))
            .unwrap_or(AuthStatus::Pending);
        let patch = MandateRecord {
            payment_payload: Some(response.clone()),
            auth_status: Some(auth_status),
            auth_payment_id: Some(payment_id.clone()),
            ..Default::default()
        };
        let written = self
            .store
            .update(
                mandate_id.as_str(),
                patch,
                Precondition::field_not_equals(fields::AUTH_STATUS, AuthStatus::Success.as_str()),
            )
            .await?;
        let auth_status = if written {
            auth_status
        } else {
            // Authorization succeeded via webhook while the call was in flight
            AuthStatus::Success
        };

        // 4. Audit
        self.events
            .record(
                AuditEventKind::MandateAuthCreated,
                json!({
                    "mandate_id": mandate_id,
                    "payment_id": payment_id,
                    "auth_status": auth_status.as_str(),
                }),
            )
            .await;

        tracing::info!(mandate_id = %mandate_id, payment_id = %payment_id, auth_status = %auth_status, "Authorization raised");

        Ok(AuthorizeMandateResult {
            mandate_id,
            payment_id,
            auth_status,
            response,
        })
    }
}
