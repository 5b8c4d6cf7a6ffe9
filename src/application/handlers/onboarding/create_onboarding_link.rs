//! CreateOnboardingLinkHandler - Issues a processor-hosted onboarding link.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::application::services::{EventLog, MerchantDirectory};
use crate::domain::foundation::{MerchantId, UserId};
use crate::domain::mandate::{AuditEventKind, MandateError};
use crate::domain::merchant::OnboardingLinkType;
use crate::ports::PaymentGateway;

#[derive(Debug, Clone)]
pub struct CreateOnboardingLinkCommand {
    pub user_id: UserId,
    /// Defaults to the merchant linked to the user.
    pub merchant_id: Option<String>,
    pub link_type: OnboardingLinkType,
    pub return_url: String,
}

#[derive(Debug, Clone)]
pub struct CreateOnboardingLinkResult {
    pub merchant_id: String,
    pub response: Value,
}

pub struct CreateOnboardingLinkHandler {
    gateway: Arc<dyn PaymentGateway>,
    merchants: MerchantDirectory,
    events: EventLog,
}

impl CreateOnboardingLinkHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, merchants: MerchantDirectory, events: EventLog) -> Self {
        Self {
            gateway,
            merchants,
            events,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateOnboardingLinkCommand,
    ) -> Result<CreateOnboardingLinkResult, MandateError> {
        let return_url = cmd.return_url.trim();
        if return_url.is_empty() {
            return Err(MandateError::validation("return_url", "is required"));
        }

        let merchant_id = match cmd.merchant_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => self
                .merchants
                .merchant_id_for_user(&cmd.user_id)
                .await?
                .ok_or_else(|| MandateError::validation("merchant_id", "no merchant onboarded for this user"))?,
        };
        let merchant_id = MerchantId::new(merchant_id)?;

        let response = self
            .gateway
            .create_onboarding_link(merchant_id.as_str(), cmd.link_type, return_url)
            .await?;

        self.events
            .record(
                AuditEventKind::OnboardLinkCreated,
                json!({
                    "user_id": cmd.user_id,
                    "merchant_id": merchant_id,
                    "link_type": cmd.link_type,
                }),
            )
            .await;

        Ok(CreateOnboardingLinkResult {
            merchant_id: merchant_id.to_string(),
            response,
        })
    }
}
