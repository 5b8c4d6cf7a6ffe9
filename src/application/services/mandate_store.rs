//! Typed access to the `mandates` collection.
//!
//! Wraps the document port with `MandateRecord` (de)serialization and
//! timestamp stamping: `createdAt` is written once when a document is
//! first inserted, `updatedAt` on every write.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::mandate::MandateRecord;
use crate::ports::{from_document, to_document, Collection, Datastore, Precondition};

/// A mandate document together with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct MandateHandle {
    pub id: String,
    pub record: MandateRecord,
}

#[derive(Clone)]
pub struct MandateStore {
    datastore: Arc<dyn Datastore>,
}

impl MandateStore {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    pub async fn get(&self, id: &str) -> Result<Option<MandateHandle>, DomainError> {
        self.datastore
            .get(Collection::Mandates, id)
            .await?
            .map(|doc| {
                Ok(MandateHandle {
                    id: id.to_string(),
                    record: from_document(doc)?,
                })
            })
            .transpose()
    }

    /// First mandate whose `field` equals `value`.
    pub async fn find_one(&self, field: &str, value: &str) -> Result<Option<MandateHandle>, DomainError> {
        let found = self
            .datastore
            .find_by_field(Collection::Mandates, field, &Value::String(value.to_string()), 1)
            .await?;

        found
            .into_iter()
            .next()
            .map(|doc| {
                Ok(MandateHandle {
                    id: doc.id,
                    record: from_document(doc.data)?,
                })
            })
            .transpose()
    }

    /// Inserts a new mandate. Returns false, writing nothing, when the key
    /// is already taken.
    pub async fn insert(&self, id: &str, mut record: MandateRecord) -> Result<bool, DomainError> {
        let now = Timestamp::now();
        record.created_at = Some(now);
        record.updated_at = Some(now);

        self.datastore
            .merge(Collection::Mandates, id, to_document(&record)?, Precondition::Absent)
            .await
    }

    /// Merges the set fields of `patch` if `precondition` holds.
    pub async fn update(
        &self,
        id: &str,
        mut patch: MandateRecord,
        precondition: Precondition,
    ) -> Result<bool, DomainError> {
        patch.created_at = None;
        patch.updated_at = Some(Timestamp::now());

        self.datastore
            .merge(Collection::Mandates, id, to_document(&patch)?, precondition)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::datastore::InMemoryDatastore;
    use crate::domain::mandate::{fields, SubscriptionStatus};

    fn store() -> (Arc<InMemoryDatastore>, MandateStore) {
        let datastore = Arc::new(InMemoryDatastore::new());
        (datastore.clone(), MandateStore::new(datastore))
    }

    #[tokio::test]
    async fn insert_stamps_created_at_once() {
        let (_, store) = store();
        let record = MandateRecord {
            local_id: Some("sub_1".to_string()),
            ..Default::default()
        };

        assert!(store.insert("mandate_E1", record.clone()).await.unwrap());
        let first = store.get("mandate_E1").await.unwrap().unwrap();
        assert!(first.record.created_at.is_some());

        assert!(!store.insert("mandate_E1", record).await.unwrap());
        let second = store.get("mandate_E1").await.unwrap().unwrap();
        assert_eq!(first.record.created_at, second.record.created_at);
    }

    #[tokio::test]
    async fn update_never_touches_created_at() {
        let (_, store) = store();
        store.insert("mandate_E1", MandateRecord::default()).await.unwrap();
        let created = store.get("mandate_E1").await.unwrap().unwrap().record.created_at;

        let patch = MandateRecord {
            created_at: Some(Timestamp::from_unix_secs(0).unwrap()),
            subscription_status: Some(SubscriptionStatus::Initialized),
            ..Default::default()
        };
        store.update("mandate_E1", patch, Precondition::Always).await.unwrap();

        let stored = store.get("mandate_E1").await.unwrap().unwrap().record;
        assert_eq!(stored.created_at, created);
        assert_eq!(stored.subscription_status, Some(SubscriptionStatus::Initialized));
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn find_one_matches_field() {
        let (_, store) = store();
        let record = MandateRecord {
            cf_subscription_id: Some("cf_1".to_string()),
            ..Default::default()
        };
        store.insert("mandate_E1", record).await.unwrap();

        let found = store.find_one(fields::CF_SUBSCRIPTION_ID, "cf_1").await.unwrap().unwrap();
        assert_eq!(found.id, "mandate_E1");
        assert!(store.find_one(fields::CF_SUBSCRIPTION_ID, "cf_2").await.unwrap().is_none());
    }
}
