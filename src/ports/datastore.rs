//! Document datastore port.
//!
//! Records are JSON objects grouped in collections and addressed by string
//! id. Writes are shallow merges of top-level fields.
//!
//! # Concurrency
//!
//! There is no in-process locking. Exactly-once effects rely on two
//! primitives that implementations MUST make atomic per document:
//!
//! - `merge` with a `Precondition` (compare-and-set)
//! - `increment` (numeric add that creates the document when missing)
//!
//! A plain read followed by an unconditional write is never enough to
//! guarantee exactly-once under concurrent delivery.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::foundation::DomainError;

/// A stored document body.
pub type Document = Map<String, Value>;

/// Collections used by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Mandates,
    Payments,
    WebhookEvents,
    /// Append-only audit log.
    Events,
    Enrollments,
    Users,
    Merchants,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Mandates => "mandates",
            Collection::Payments => "payments",
            Collection::WebhookEvents => "webhook_events",
            Collection::Events => "events",
            Collection::Enrollments => "enrollments",
            Collection::Users => "users",
            Collection::Merchants => "merchants",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Condition a merge must satisfy to be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// Apply unconditionally (creating the document if missing).
    Always,
    /// Apply only if the document does not exist yet.
    Absent,
    /// Apply only if `field` currently equals `value`.
    ///
    /// `Value::Null` matches a missing field and a missing document.
    FieldEquals { field: String, value: Value },
    /// Apply only if `field` is currently not equal to `value`.
    ///
    /// A missing field or document counts as not equal.
    FieldNotEquals { field: String, value: Value },
}

impl Precondition {
    pub fn field_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Precondition::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field_not_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Precondition::FieldNotEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluates the condition against the current document, if any.
    ///
    /// Shared by adapters that evaluate conditions in process.
    pub fn holds(&self, current: Option<&Document>) -> bool {
        match self {
            Precondition::Always => true,
            Precondition::Absent => current.is_none(),
            Precondition::FieldEquals { field, value } => {
                match current.and_then(|doc| doc.get(field)) {
                    Some(actual) => actual == value,
                    None => value.is_null(),
                }
            }
            Precondition::FieldNotEquals { field, value } => {
                current.and_then(|doc| doc.get(field)) != Some(value)
            }
        }
    }
}

/// A document together with its id, as returned by queries.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

/// Port for the document store.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Fetch a document by id.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DomainError>;

    /// Merge top-level fields into a document if `precondition` holds.
    ///
    /// Creates the document when it is missing and the precondition allows.
    /// Returns whether the write was applied.
    async fn merge(
        &self,
        collection: Collection,
        id: &str,
        data: Document,
        precondition: Precondition,
    ) -> Result<bool, DomainError>;

    /// Documents whose top-level `field` equals `value`, at most `limit`.
    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, DomainError>;

    /// Append a document under a generated id and return the id.
    async fn add(&self, collection: Collection, data: Document) -> Result<String, DomainError>;

    /// Atomically add `delta` to numeric `field`, merging `also_merge` in the
    /// same write. A missing document or field starts from zero.
    ///
    /// Returns the new value.
    async fn increment(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        delta: i64,
        also_merge: Document,
    ) -> Result<i64, DomainError>;
}

/// Serializes a value into a document body.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, DomainError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DomainError::database(format!(
            "expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(DomainError::database(format!("serialization failed: {}", e))),
    }
}

/// Deserializes a document body.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, DomainError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| DomainError::database(format!("corrupt document: {}", e)))
}
