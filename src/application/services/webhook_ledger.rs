//! Dedup ledger of fully applied webhook deliveries.
//!
//! A key is written only after its delivery has been applied, so a crash
//! mid-processing leads to reprocessing on redelivery rather than a lost
//! event.

use std::sync::Arc;

use serde_json::json;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::mandate::GatewayWebhook;
use crate::ports::{to_document, Collection, Datastore, Precondition};

#[derive(Clone)]
pub struct WebhookLedger {
    datastore: Arc<dyn Datastore>,
}

impl WebhookLedger {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    pub async fn is_processed(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.datastore.get(Collection::WebhookEvents, key).await?.is_some())
    }

    pub async fn mark_processed(&self, key: &str, webhook: &GatewayWebhook) -> Result<(), DomainError> {
        let entry = to_document(&json!({
            "type": webhook.event_type.as_str(),
            "event_time": webhook.event_time,
            "payment_id": webhook.payment_id(),
            "processedAt": Timestamp::now(),
        }))?;

        self.datastore
            .merge(Collection::WebhookEvents, key, entry, Precondition::Always)
            .await?;
        Ok(())
    }
}
