//! CreateMandateHandler - Command handler for creating a mandate with the processor.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::application::services::{EventLog, MandateStore};
use crate::domain::foundation::{
    generate_local_subscription_id, EnrollmentId, MandateId, MerchantId, UserId,
};
use crate::domain::mandate::{
    fields, identifiers::response, AuditEventKind, MandateError, MandateRecord,
    SubscriptionStatus, SubscriptionTerms,
};
use crate::ports::{PaymentGateway, Precondition};

/// Command to create the mandate for an enrollment.
#[derive(Debug, Clone)]
pub struct CreateMandateCommand {
    pub merchant_id: String,
    pub enrollment_id: String,
    pub user_id: Option<UserId>,
    pub terms: SubscriptionTerms,
}

/// Result of successful mandate creation.
#[derive(Debug, Clone)]
pub struct CreateMandateResult {
    pub mandate_id: MandateId,
    pub subscription_id: String,
    pub cf_subscription_id: Option<String>,
    pub subscription_session_id: Option<String>,
    pub status: SubscriptionStatus,
    /// Raw processor response.
    pub response: Value,
}

/// Handler for mandate creation.
pub struct CreateMandateHandler {
    gateway: Arc<dyn PaymentGateway>,
    store: MandateStore,
    events: EventLog,
}

impl CreateMandateHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, store: MandateStore, events: EventLog) -> Self {
        Self {
            gateway,
            store,
            events,
        }
    }

    pub async fn handle(&self, cmd: CreateMandateCommand) -> Result<CreateMandateResult, MandateError> {
        // 1. Validate inputs
        let merchant_id = MerchantId::new(cmd.merchant_id)?;
        let enrollment_id = EnrollmentId::new(cmd.enrollment_id)?;
        cmd.terms.validate()?;
        let mandate_id = MandateId::for_enrollment(&enrollment_id);

        // 2. Refuse to create a second processor subscription
        let existing = self.store.get(mandate_id.as_str()).await?;
        if let Some(existing) = &existing {
            ensure_no_processor_subscription(&mandate_id, &existing.record)?;
        }

        // 3. Persist the local record before calling out, reusing the local id
        //    of a previous failed attempt
        let local_id = existing
            .as_ref()
            .and_then(|m| m.record.local_id.clone())
            .unwrap_or_else(generate_local_subscription_id);
        let record = MandateRecord {
            mandate_id: Some(mandate_id.to_string()),
            local_id: Some(local_id.clone()),
            merchant_id: Some(merchant_id.to_string()),
            user_id: cmd.user_id.as_ref().map(ToString::to_string),
            enrollment_id: Some(enrollment_id.to_string()),
            first_charge_time: cmd.terms.schedule.first_charge_time.clone(),
            ..Default::default()
        };
        if existing.is_some() {
            self.store
                .update(mandate_id.as_str(), record, Precondition::Always)
                .await?;
        } else if !self.store.insert(mandate_id.as_str(), record).await? {
            // Another request created it in between
            if let Some(raced) = self.store.get(mandate_id.as_str()).await? {
                ensure_no_processor_subscription(&mandate_id, &raced.record)?;
            }
        }

        // 4. Create the remote subscription; the mandate id is the idempotency key
        let payload = cmd.terms.to_payload(&local_id);
        let response = self
            .gateway
            .create_subscription(merchant_id.as_str(), &payload, mandate_id.as_str())
            .await
            .map_err(|e| {
                tracing::error!(mandate_id = %mandate_id, error = %e, "Subscription creation failed");
                MandateError::from(e)
            })?;

        // 5. Record what the processor assigned
        let subscription_id = response::SUBSCRIPTION_ID
            .extract(&response)
            .unwrap_or_else(|| local_id.clone());
        let cf_subscription_id = response::CF_SUBSCRIPTION_ID.extract(&response);
        let subscription_session_id = response::SUBSCRIPTION_SESSION_ID.extract(&response);
        let status = response::SUBSCRIPTION_STATUS
            .extract(&response)
            .and_then(|s| s.parse().ok())
            .unwrap_or(SubscriptionStatus::Initialized);

        let ids = MandateRecord {
            subscription_id: Some(subscription_id.clone()),
            cf_subscription_id: cf_subscription_id.clone(),
            subscription_session_id: subscription_session_id.clone(),
            next_schedule_date: response::NEXT_SCHEDULE_DATE.extract(&response),
            raw_cf_response: Some(response.clone()),
            ..Default::default()
        };
        let with_status = MandateRecord {
            subscription_status: Some(status),
            ..ids.clone()
        };
        let status_written = self
            .store
            .update(
                mandate_id.as_str(),
                with_status,
                Precondition::field_equals(fields::SUBSCRIPTION_STATUS, Value::Null),
            )
            .await?;
        if !status_written {
            // A webhook already reported a status; keep it, store the ids only
            tracing::info!(mandate_id = %mandate_id, "Status already set by webhook, recording ids only");
            self.store
                .update(mandate_id.as_str(), ids, Precondition::Always)
                .await?;
        }

        // 6. Audit
        self.events
            .record(
                AuditEventKind::MandateCreated,
                json!({
                    "mandate_id": mandate_id,
                    "merchant_id": merchant_id.as_str(),
                    "enrollment_id": enrollment_id.as_str(),
                    "subscription_id": subscription_id,
                    "cf_subscription_id": cf_subscription_id,
                }),
            )
            .await;

        tracing::info!(
            mandate_id = %mandate_id,
            subscription_id = %subscription_id,
            status = %status,
            "Mandate created"
        );

        Ok(CreateMandateResult {
            mandate_id,
            subscription_id,
            cf_subscription_id,
            subscription_session_id,
            status,
            response,
        })
    }
}

fn ensure_no_processor_subscription(
    mandate_id: &MandateId,
    record: &MandateRecord,
) -> Result<(), MandateError> {
    if record.has_processor_subscription() {
        tracing::warn!(mandate_id = %mandate_id, "Mandate already has a processor subscription");
        return Err(MandateError::conflict(format!(
            "Mandate {} already exists for this enrollment",
            mandate_id
        )));
    }
    Ok(())
}
