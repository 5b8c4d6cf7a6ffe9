//! GetMerchantStatusHandler - Reads a merchant's onboarding status from the processor.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::foundation::MerchantId;
use crate::domain::mandate::{identifiers::response, MandateError};
use crate::domain::merchant::DEFAULT_ONBOARDING_STATUS;
use crate::ports::PaymentGateway;

#[derive(Debug, Clone)]
pub struct GetMerchantStatusQuery {
    pub merchant_id: String,
}

#[derive(Debug, Clone)]
pub struct MerchantStatusView {
    pub merchant_id: String,
    pub onboarding_status: String,
    pub response: Value,
}

pub struct GetMerchantStatusHandler {
    gateway: Arc<dyn PaymentGateway>,
}

impl GetMerchantStatusHandler {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    pub async fn handle(&self, query: GetMerchantStatusQuery) -> Result<MerchantStatusView, MandateError> {
        let merchant_id = MerchantId::new(query.merchant_id)?;
        let response = self.gateway.get_merchant(merchant_id.as_str()).await?;
        let onboarding_status = response::ONBOARDING_STATUS
            .extract(&response)
            .unwrap_or_else(|| DEFAULT_ONBOARDING_STATUS.to_string());

        Ok(MerchantStatusView {
            merchant_id: merchant_id.to_string(),
            onboarding_status,
            response,
        })
    }
}
