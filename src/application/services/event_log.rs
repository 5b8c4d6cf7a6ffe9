//! Append-only audit trail in the `events` collection.
//!
//! Recording never fails the caller: a write error is logged and dropped,
//! since an audit gap must not turn a processed request into an error.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::domain::foundation::Timestamp;
use crate::domain::mandate::AuditEventKind;
use crate::ports::{to_document, Collection, Datastore};

#[derive(Clone)]
pub struct EventLog {
    datastore: Arc<dyn Datastore>,
    namespace: String,
}

impl EventLog {
    /// `namespace` prefixes every stored type, e.g. `cashfree`.
    pub fn new(datastore: Arc<dyn Datastore>, namespace: impl Into<String>) -> Self {
        Self {
            datastore,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn record(&self, kind: AuditEventKind, payload: Value) {
        let event_type = kind.namespaced(&self.namespace);
        if kind.is_error() {
            tracing::warn!(event_type = %event_type, "Recording error event");
        } else {
            tracing::debug!(event_type = %event_type, "Recording event");
        }

        let entry = json!({
            "type": event_type,
            "payload": payload,
            "createdAt": Timestamp::now(),
        });
        let document = match to_document(&entry) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(event_type = %event_type, error = %e, "Failed to encode audit event");
                return;
            }
        };

        if let Err(e) = self.datastore.add(Collection::Events, document).await {
            tracing::warn!(event_type = %event_type, error = %e, "Failed to record audit event");
        }
    }
}
