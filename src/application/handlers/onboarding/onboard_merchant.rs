//! OnboardMerchantHandler - Creates a sub-merchant for a user.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::application::services::{EventLog, MerchantDirectory};
use crate::domain::foundation::UserId;
use crate::domain::mandate::{AuditEventKind, MandateError};
use crate::domain::merchant::{merchant_id_from_response, onboarding_status_from_response, MerchantLink};
use crate::ports::PaymentGateway;

#[derive(Debug, Clone)]
pub struct OnboardMerchantCommand {
    pub user_id: UserId,
    /// Merchant details forwarded to the processor as-is.
    pub merchant_info: Value,
}

#[derive(Debug, Clone)]
pub struct OnboardMerchantResult {
    pub merchant_id: String,
    pub onboarding_status: String,
    pub response: Value,
}

pub struct OnboardMerchantHandler {
    gateway: Arc<dyn PaymentGateway>,
    merchants: MerchantDirectory,
    events: EventLog,
}

impl OnboardMerchantHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, merchants: MerchantDirectory, events: EventLog) -> Self {
        Self {
            gateway,
            merchants,
            events,
        }
    }

    pub async fn handle(&self, cmd: OnboardMerchantCommand) -> Result<OnboardMerchantResult, MandateError> {
        if !cmd.merchant_info.as_object().is_some_and(|info| !info.is_empty()) {
            return Err(MandateError::validation("merchant_info", "must be a non-empty object"));
        }

        let response = self.gateway.create_merchant(&cmd.merchant_info).await?;

        // Older API versions answer without echoing the id
        let merchant_id = merchant_id_from_response(&response)
            .or_else(|| merchant_id_from_response(&cmd.merchant_info))
            .ok_or_else(|| MandateError::upstream(None, "merchant creation response carried no merchant_id"))?;
        let onboarding_status = onboarding_status_from_response(&response);

        self.merchants
            .link(
                &cmd.user_id,
                &merchant_id,
                MerchantLink {
                    merchant_id: Some(merchant_id.clone()),
                    onboarding_status: Some(onboarding_status.clone()),
                    raw: Some(response.clone()),
                },
            )
            .await?;

        self.events
            .record(
                AuditEventKind::OnboardCreated,
                json!({ "user_id": cmd.user_id, "merchant_id": merchant_id }),
            )
            .await;

        tracing::info!(user_id = %cmd.user_id, merchant_id = %merchant_id, "Merchant onboarded");

        Ok(OnboardMerchantResult {
            merchant_id,
            onboarding_status,
            response,
        })
    }
}
