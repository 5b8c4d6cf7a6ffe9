//! In-memory datastore.
//!
//! Backs the test suite and keyless local development. Every operation
//! holds a single async mutex for its whole duration, so conditional merges
//! and increments are atomic with respect to each other.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{Collection, Datastore, Document, Precondition, StoredDocument};

#[derive(Default)]
struct State {
    collections: HashMap<Collection, BTreeMap<String, Document>>,
    failing: HashSet<Collection>,
}

impl State {
    fn check_writable(&self, collection: Collection) -> Result<(), DomainError> {
        if self.failing.contains(&collection) {
            return Err(DomainError::database(format!(
                "simulated write failure on {}",
                collection
            )));
        }
        Ok(())
    }
}

/// Datastore kept entirely in process memory.
#[derive(Default)]
pub struct InMemoryDatastore {
    state: Mutex<State>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Inserts or replaces a document without any precondition.
    pub async fn seed(&self, collection: Collection, id: &str, data: Document) {
        self.state
            .lock()
            .await
            .collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), data);
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: Collection) -> usize {
        self.state
            .lock()
            .await
            .collections
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    /// All documents in a collection, ordered by id.
    pub async fn all(&self, collection: Collection) -> Vec<StoredDocument> {
        self.state
            .lock()
            .await
            .collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| StoredDocument {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Makes every write to `collection` fail until cleared.
    pub async fn fail_writes_to(&self, collection: Collection) {
        self.state.lock().await.failing.insert(collection);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failing.clear();
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn merge(
        &self,
        collection: Collection,
        id: &str,
        data: Document,
        precondition: Precondition,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        state.check_writable(collection)?;

        let docs = state.collections.entry(collection).or_default();
        if !precondition.holds(docs.get(id)) {
            return Ok(false);
        }
        let doc = docs.entry(id.to_string()).or_default();
        for (key, value) in data {
            doc.insert(key, value);
        }
        Ok(true)
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| data.get(field) == Some(value))
                    .take(limit)
                    .map(|(id, data)| StoredDocument {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn add(&self, collection: Collection, data: Document) -> Result<String, DomainError> {
        let mut state = self.state.lock().await;
        state.check_writable(collection)?;

        let id = uuid::Uuid::new_v4().to_string();
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn increment(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        delta: i64,
        also_merge: Document,
    ) -> Result<i64, DomainError> {
        let mut state = self.state.lock().await;
        state.check_writable(collection)?;

        let doc = state
            .collections
            .entry(collection)
            .or_default()
            .entry(id.to_string())
            .or_default();
        let current = match doc.get(field) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                DomainError::database(format!("field '{}' of {}/{} is not an integer", field, collection, id))
            })?,
        };
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| DomainError::database(format!("overflow incrementing '{}'", field)))?;

        for (key, value) in also_merge {
            doc.insert(key, value);
        }
        doc.insert(field.to_string(), Value::from(updated));
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn merge_creates_then_updates_fields() {
        let store = InMemoryDatastore::new();

        let applied = store
            .merge(Collection::Mandates, "m1", doc(json!({ "a": 1, "b": 2 })), Precondition::Always)
            .await
            .unwrap();
        assert!(applied);

        store
            .merge(Collection::Mandates, "m1", doc(json!({ "b": 3 })), Precondition::Always)
            .await
            .unwrap();

        let stored = store.get(Collection::Mandates, "m1").await.unwrap().unwrap();
        assert_eq!(Value::Object(stored), json!({ "a": 1, "b": 3 }));
    }

    #[tokio::test]
    async fn absent_precondition_only_writes_once() {
        let store = InMemoryDatastore::new();

        assert!(store
            .merge(Collection::Mandates, "m1", doc(json!({ "v": 1 })), Precondition::Absent)
            .await
            .unwrap());
        assert!(!store
            .merge(Collection::Mandates, "m1", doc(json!({ "v": 2 })), Precondition::Absent)
            .await
            .unwrap());

        let stored = store.get(Collection::Mandates, "m1").await.unwrap().unwrap();
        assert_eq!(stored["v"], 1);
    }

    #[tokio::test]
    async fn failed_precondition_leaves_document_untouched() {
        let store = InMemoryDatastore::new();
        store.seed(Collection::Payments, "p1", doc(json!({ "payment_status": "SUCCESS" }))).await;

        let applied = store
            .merge(
                Collection::Payments,
                "p1",
                doc(json!({ "payment_status": "FAILED" })),
                Precondition::field_not_equals("payment_status", "SUCCESS"),
            )
            .await
            .unwrap();

        assert!(!applied);
        let stored = store.get(Collection::Payments, "p1").await.unwrap().unwrap();
        assert_eq!(stored["payment_status"], "SUCCESS");
    }

    #[tokio::test]
    async fn find_by_field_respects_limit() {
        let store = InMemoryDatastore::new();
        for id in ["a", "b", "c"] {
            store.seed(Collection::Mandates, id, doc(json!({ "merchantId": "M1" }))).await;
        }
        store.seed(Collection::Mandates, "d", doc(json!({ "merchantId": "M2" }))).await;

        let found = store
            .find_by_field(Collection::Mandates, "merchantId", &json!("M1"), 2)
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "a");
    }

    #[tokio::test]
    async fn add_generates_distinct_ids() {
        let store = InMemoryDatastore::new();
        let a = store.add(Collection::Events, doc(json!({ "type": "x" }))).await.unwrap();
        let b = store.add(Collection::Events, doc(json!({ "type": "x" }))).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.count(Collection::Events).await, 2);
    }

    #[tokio::test]
    async fn increment_starts_from_zero_and_merges_extra_fields() {
        let store = InMemoryDatastore::new();

        let first = store
            .increment(Collection::Enrollments, "E1", "paid", 500, doc(json!({ "last": "t1" })))
            .await
            .unwrap();
        let second = store
            .increment(Collection::Enrollments, "E1", "paid", 250, doc(json!({ "last": "t2" })))
            .await
            .unwrap();

        assert_eq!(first, 500);
        assert_eq!(second, 750);
        let stored = store.get(Collection::Enrollments, "E1").await.unwrap().unwrap();
        assert_eq!(stored["last"], "t2");
    }

    #[tokio::test]
    async fn increment_rejects_non_numeric_field() {
        let store = InMemoryDatastore::new();
        store.seed(Collection::Enrollments, "E1", doc(json!({ "paid": "lots" }))).await;

        let result = store
            .increment(Collection::Enrollments, "E1", "paid", 1, Document::new())
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryDatastore::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .increment(Collection::Enrollments, "E1", "paid", 2, Document::new())
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = store.get(Collection::Enrollments, "E1").await.unwrap().unwrap();
        assert_eq!(stored["paid"], 100);
    }

    #[tokio::test]
    async fn simulated_failures_reject_writes() {
        let store = InMemoryDatastore::new();
        store.fail_writes_to(Collection::WebhookEvents).await;

        let result = store
            .merge(Collection::WebhookEvents, "k", Document::new(), Precondition::Always)
            .await;
        assert!(result.is_err());

        store.clear_failures().await;
        assert!(store
            .merge(Collection::WebhookEvents, "k", Document::new(), Precondition::Always)
            .await
            .unwrap());
    }
}
