//! Locates the single mandate document behind any of its identifiers.
//!
//! Lookup order for a candidate id, first match wins:
//!
//! 1. document key
//! 2. `subscription_id` field
//! 3. `cf_subscription_id` field
//!
//! What happens on a miss is the caller's choice (`ResolvePolicy`).

use super::mandate_store::{MandateHandle, MandateStore};
use crate::domain::foundation::DomainError;
use crate::domain::mandate::{fields, MandateRecord, SubscriptionKeys};

/// Behaviour when no document matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Report not-found. Used where the mandate must already exist.
    Strict,
    /// Create a stub keyed by the candidate id.
    UpsertOnMiss,
}

#[derive(Clone)]
pub struct IdentifierResolver {
    store: MandateStore,
}

impl IdentifierResolver {
    pub fn new(store: MandateStore) -> Self {
        Self { store }
    }

    /// Resolves one candidate id.
    pub async fn resolve(
        &self,
        candidate: &str,
        policy: ResolvePolicy,
    ) -> Result<Option<MandateHandle>, DomainError> {
        if let Some(found) = self.lookup(candidate).await? {
            return Ok(Some(found));
        }

        match policy {
            ResolvePolicy::Strict => Ok(None),
            ResolvePolicy::UpsertOnMiss => {
                let stub = MandateRecord {
                    subscription_id: Some(candidate.to_string()),
                    ..Default::default()
                };
                self.upsert_stub(candidate, stub).await.map(Some)
            }
        }
    }

    /// Resolves from the identifiers of a webhook payload, preferring the
    /// processor's `cf_subscription_id`.
    pub async fn resolve_by_fields(
        &self,
        keys: &SubscriptionKeys,
        policy: ResolvePolicy,
    ) -> Result<Option<MandateHandle>, DomainError> {
        let candidates = [keys.cf_subscription_id.as_deref(), keys.subscription_id.as_deref()];
        for candidate in candidates.into_iter().flatten() {
            if let Some(found) = self.lookup(candidate).await? {
                return Ok(Some(found));
            }
        }

        match (policy, keys.subscription_id.as_deref().or(keys.cf_subscription_id.as_deref())) {
            (ResolvePolicy::UpsertOnMiss, Some(key)) => {
                let stub = MandateRecord {
                    subscription_id: keys.subscription_id.clone(),
                    cf_subscription_id: keys.cf_subscription_id.clone(),
                    ..Default::default()
                };
                self.upsert_stub(key, stub).await.map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn lookup(&self, candidate: &str) -> Result<Option<MandateHandle>, DomainError> {
        if candidate.trim().is_empty() {
            return Ok(None);
        }
        if let Some(found) = self.store.get(candidate).await? {
            return Ok(Some(found));
        }
        if let Some(found) = self.store.find_one(fields::SUBSCRIPTION_ID, candidate).await? {
            return Ok(Some(found));
        }
        self.store.find_one(fields::CF_SUBSCRIPTION_ID, candidate).await
    }

    /// Inserts a stub; if another writer got there first, returns theirs.
    async fn upsert_stub(&self, key: &str, stub: MandateRecord) -> Result<MandateHandle, DomainError> {
        if self.store.insert(key, stub).await? {
            tracing::info!(mandate_id = %key, "Created stub mandate for unknown subscription");
        } else {
            tracing::debug!(mandate_id = %key, "Stub insert lost a race, re-reading");
        }

        self.store
            .get(key)
            .await?
            .ok_or_else(|| DomainError::database(format!("mandate {} vanished after insert", key)))
    }
}
