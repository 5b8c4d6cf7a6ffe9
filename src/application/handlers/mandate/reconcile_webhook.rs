//! WebhookReconciler - Applies verified processor notifications.
//!
//! Order of work for one delivery:
//!
//! 1. verify the signature (rejections are audited and surface as 401)
//! 2. audit receipt as `webhook.<TYPE>`
//! 3. skip keys already in the dedup ledger
//! 4. resolve the mandate, preferring `cf_subscription_id`
//! 5. apply the transition
//! 6. write the ledger entry, last, so a crash before it means reprocessing
//!
//! Nothing after verification is reported to the transport as a failure.
//! Errors are audited as `webhook.processing_error` and the delivery is left
//! out of the ledger so a redelivery retries it.

use std::sync::Arc;

use serde_json::json;

use crate::application::services::{
    EventLog, IdentifierResolver, MandateLifecycle, MerchantDirectory, ResolvePolicy,
    TransitionOutcome, WebhookLedger,
};
use crate::domain::foundation::DomainError;
use crate::domain::mandate::{
    identifiers, AuditEventKind, GatewayWebhook, SignatureHeaders, SignatureVerifier,
    WebhookEventType,
};
use crate::domain::merchant::DEFAULT_ONBOARDING_STATUS;

/// What happened to one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Signature check failed; nothing was processed.
    Rejected,
    /// Already applied by an earlier delivery.
    Duplicate,
    Applied(TransitionOutcome),
    /// Merchant onboarding status mirrored onto merchant and owner.
    OnboardingUpdated { merchant_id: String },
    /// No mandate matches the payload's identifiers.
    Unresolved,
    Ignored(String),
    /// Processing failed; audited and left for redelivery.
    Failed(String),
}

impl ReconcileOutcome {
    /// Whether the transport should refuse the delivery.
    pub fn is_rejected(&self) -> bool {
        matches!(self, ReconcileOutcome::Rejected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Rejected => "rejected",
            ReconcileOutcome::Duplicate => "duplicate",
            ReconcileOutcome::Applied(outcome) => outcome.label(),
            ReconcileOutcome::OnboardingUpdated { .. } => "onboarding_updated",
            ReconcileOutcome::Unresolved => "unresolved",
            ReconcileOutcome::Ignored(_) => "ignored",
            ReconcileOutcome::Failed(_) => "failed",
        }
    }
}

pub struct WebhookReconciler {
    verifier: Arc<SignatureVerifier>,
    resolver: IdentifierResolver,
    lifecycle: MandateLifecycle,
    ledger: WebhookLedger,
    merchants: MerchantDirectory,
    events: EventLog,
}

impl WebhookReconciler {
    pub fn new(
        verifier: Arc<SignatureVerifier>,
        resolver: IdentifierResolver,
        lifecycle: MandateLifecycle,
        ledger: WebhookLedger,
        merchants: MerchantDirectory,
        events: EventLog,
    ) -> Self {
        Self {
            verifier,
            resolver,
            lifecycle,
            ledger,
            merchants,
            events,
        }
    }

    /// Handles one delivery. Never fails; the outcome is informational.
    pub async fn handle(&self, headers: &SignatureHeaders, raw_body: &[u8]) -> ReconcileOutcome {
        if !self.verifier.verify(headers, Some(raw_body)) {
            self.events
                .record(
                    AuditEventKind::WebhookInvalidSignature,
                    json!({
                        "timestamp": headers.timestamp,
                        "signature_present": headers.signature.is_some(),
                    }),
                )
                .await;
            return ReconcileOutcome::Rejected;
        }

        let webhook = match GatewayWebhook::parse(raw_body) {
            Ok(webhook) => webhook,
            Err(e) => {
                tracing::warn!(error = %e, "Verified webhook could not be parsed");
                self.events
                    .record(
                        AuditEventKind::WebhookProcessingError,
                        json!({ "error": e.to_string() }),
                    )
                    .await;
                return ReconcileOutcome::Failed(e.to_string());
            }
        };

        self.events
            .record(
                AuditEventKind::WebhookReceived(webhook.event_type.to_string()),
                webhook.payload.clone(),
            )
            .await;

        match self.process(&webhook).await {
            Ok(outcome) => {
                tracing::info!(event_type = %webhook.event_type, outcome = ?outcome, "Webhook processed");
                outcome
            }
            Err(e) => {
                tracing::error!(event_type = %webhook.event_type, error = %e, "Webhook processing failed");
                self.events
                    .record(
                        AuditEventKind::WebhookProcessingError,
                        json!({
                            "event_type": webhook.event_type.as_str(),
                            "dedup_key": webhook.dedup_key(),
                            "error": e.to_string(),
                        }),
                    )
                    .await;
                ReconcileOutcome::Failed(e.to_string())
            }
        }
    }

    async fn process(&self, webhook: &GatewayWebhook) -> Result<ReconcileOutcome, DomainError> {
        let key = webhook.dedup_key();
        if self.ledger.is_processed(&key).await? {
            tracing::info!(dedup_key = %key, "Duplicate webhook delivery");
            return Ok(ReconcileOutcome::Duplicate);
        }

        if webhook.event_type == WebhookEventType::MerchantOnboardingStatus {
            return self.apply_onboarding(webhook, &key).await;
        }
        if !webhook.event_type.is_subscription_event() {
            return Ok(ReconcileOutcome::Ignored(format!(
                "unhandled event type {}",
                webhook.event_type
            )));
        }

        let keys = webhook.subscription_keys();
        let mandate = match self.resolver.resolve_by_fields(&keys, ResolvePolicy::Strict).await? {
            Some(mandate) => mandate,
            None => {
                tracing::warn!(
                    event_type = %webhook.event_type,
                    subscription = keys.display_key(),
                    "No mandate for webhook"
                );
                self.events
                    .record(
                        AuditEventKind::WebhookUpsertError,
                        json!({
                            "event_type": webhook.event_type.as_str(),
                            "subscription_id": keys.subscription_id,
                            "cf_subscription_id": keys.cf_subscription_id,
                            "reason": "mandate not found",
                        }),
                    )
                    .await;
                return Ok(ReconcileOutcome::Unresolved);
            }
        };

        let outcome = self.lifecycle.apply_webhook_transition(&mandate, webhook).await?;
        self.ledger.mark_processed(&key, webhook).await?;
        Ok(ReconcileOutcome::Applied(outcome))
    }

    async fn apply_onboarding(
        &self,
        webhook: &GatewayWebhook,
        key: &str,
    ) -> Result<ReconcileOutcome, DomainError> {
        let merchant_id = match identifiers::MERCHANT_ID.extract(&webhook.payload) {
            Some(id) => id,
            None => return Ok(ReconcileOutcome::Ignored("merchant_id missing from payload".to_string())),
        };
        let status = identifiers::ONBOARDING_STATUS
            .extract(&webhook.payload)
            .unwrap_or_else(|| DEFAULT_ONBOARDING_STATUS.to_string());

        self.merchants.update_onboarding_status(&merchant_id, &status).await?;
        self.ledger.mark_processed(key, webhook).await?;

        tracing::info!(merchant_id = %merchant_id, status = %status, "Merchant onboarding status updated");
        Ok(ReconcileOutcome::OnboardingUpdated { merchant_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::datastore::InMemoryDatastore;
    use crate::application::services::{MandateStore, PaymentLedger};
    use crate::domain::foundation::{Timestamp, UserId};
    use crate::domain::mandate::{
        compute_signature, MandateRecord, Money, PaymentStatus, SubscriptionStatus,
    };
    use crate::domain::merchant::MerchantLink;
    use crate::ports::{Collection, Datastore};
    use secrecy::SecretString;
    use serde_json::Value;

    const SECRET: &str = "whsec_test";

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        datastore: Arc<InMemoryDatastore>,
        store: MandateStore,
        reconciler: WebhookReconciler,
    }

    fn fixture() -> Fixture {
        let datastore = Arc::new(InMemoryDatastore::new());
        let store = MandateStore::new(datastore.clone());
        let reconciler = WebhookReconciler::new(
            Arc::new(SignatureVerifier::new(Some(SecretString::new(SECRET.to_string())), 300)),
            IdentifierResolver::new(store.clone()),
            MandateLifecycle::new(store.clone(), PaymentLedger::new(datastore.clone())),
            WebhookLedger::new(datastore.clone()),
            MerchantDirectory::new(datastore.clone()),
            EventLog::new(datastore.clone(), "cashfree"),
        );
        Fixture {
            datastore,
            store,
            reconciler,
        }
    }

    async fn seed_active(fx: &Fixture) {
        fx.store
            .insert(
                "mandate_E1",
                MandateRecord {
                    subscription_id: Some("sub_1".to_string()),
                    cf_subscription_id: Some("cf_1".to_string()),
                    subscription_status: Some(SubscriptionStatus::Active),
                    enrollment_id: Some("E1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    fn signed(body: &Value) -> (SignatureHeaders, Vec<u8>) {
        let raw = serde_json::to_vec(body).unwrap();
        let timestamp = Timestamp::now().as_unix_secs().to_string();
        let signature = compute_signature(SECRET, &timestamp, &raw);
        (SignatureHeaders::new(signature, timestamp), raw)
    }

    fn charge_success() -> Value {
        json!({
            "type": "SUBSCRIPTION_PAYMENT_SUCCESS",
            "event_time": "2024-06-01T10:00:00Z",
            "data": {
                "payment_id": "pay_1",
                "payment_type": "CHARGE",
                "payment_status": "SUCCESS",
                "payment_amount": 500,
                "subscription_details": { "cf_subscription_id": "cf_1" }
            }
        })
    }

    async fn event_types(fx: &Fixture) -> Vec<String> {
        fx.datastore
            .all(Collection::Events)
            .await
            .into_iter()
            .map(|e| e.data["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Verification
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn bad_signature_is_rejected_and_audited() {
        let fx = fixture();
        seed_active(&fx).await;
        let (_, raw) = signed(&charge_success());
        let headers = SignatureHeaders::new("forged", Timestamp::now().as_unix_secs().to_string());

        let outcome = fx.reconciler.handle(&headers, &raw).await;

        assert_eq!(outcome, ReconcileOutcome::Rejected);
        assert!(outcome.is_rejected());
        assert_eq!(event_types(&fx).await, vec!["cashfree.webhook.invalid_signature"]);
        let events = fx.datastore.all(Collection::Events).await;
        assert_eq!(events[0].data["payload"]["signature_present"], true);
        assert_eq!(fx.datastore.count(Collection::Payments).await, 0);
    }

    #[tokio::test]
    async fn stale_timestamp_is_rejected() {
        let fx = fixture();
        seed_active(&fx).await;
        let raw = serde_json::to_vec(&charge_success()).unwrap();
        let stale = (Timestamp::now().as_unix_secs() - 3_600).to_string();
        let headers = SignatureHeaders::new(compute_signature(SECRET, &stale, &raw), stale);

        assert_eq!(fx.reconciler.handle(&headers, &raw).await, ReconcileOutcome::Rejected);
        assert_eq!(fx.datastore.count(Collection::Payments).await, 0);
    }

    #[tokio::test]
    async fn unparseable_verified_body_fails_without_rejecting() {
        let fx = fixture();
        let raw = b"not json".to_vec();
        let timestamp = Timestamp::now().as_unix_secs().to_string();
        let headers = SignatureHeaders::new(compute_signature(SECRET, &timestamp, &raw), timestamp);

        let outcome = fx.reconciler.handle(&headers, &raw).await;

        assert!(matches!(outcome, ReconcileOutcome::Failed(_)));
        assert_eq!(event_types(&fx).await, vec!["cashfree.webhook.processing_error"]);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Application and dedup
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_delivery_credits_once() {
        let fx = fixture();
        seed_active(&fx).await;
        let (headers, raw) = signed(&charge_success());

        let first = fx.reconciler.handle(&headers, &raw).await;
        let second = fx.reconciler.handle(&headers, &raw).await;

        assert_eq!(
            first,
            ReconcileOutcome::Applied(TransitionOutcome::PaymentSettled {
                payment_id: "pay_1".to_string(),
                credited: Some(Money::from_minor(50_000))
            })
        );
        assert_eq!(second, ReconcileOutcome::Duplicate);
        let enrollment = fx.datastore.get(Collection::Enrollments, "E1").await.unwrap().unwrap();
        assert_eq!(enrollment["paid_amount_minor"], 50_000);
        assert_eq!(fx.datastore.count(Collection::WebhookEvents).await, 1);
    }

    #[tokio::test]
    async fn receipt_is_audited_before_processing() {
        let fx = fixture();
        seed_active(&fx).await;
        let (headers, raw) = signed(&charge_success());

        fx.reconciler.handle(&headers, &raw).await;

        assert_eq!(
            event_types(&fx).await,
            vec!["cashfree.webhook.SUBSCRIPTION_PAYMENT_SUCCESS"]
        );
    }

    #[tokio::test]
    async fn unknown_subscription_is_unresolved_and_not_marked() {
        let fx = fixture();
        let (headers, raw) = signed(&charge_success());

        let outcome = fx.reconciler.handle(&headers, &raw).await;

        assert_eq!(outcome, ReconcileOutcome::Unresolved);
        assert_eq!(fx.datastore.count(Collection::Mandates).await, 0);
        assert_eq!(fx.datastore.count(Collection::WebhookEvents).await, 0);
        assert!(event_types(&fx).await.contains(&"cashfree.webhook.upsert_error".to_string()));
    }

    #[tokio::test]
    async fn storage_failure_leaves_delivery_for_retry() {
        let fx = fixture();
        seed_active(&fx).await;
        fx.datastore.fail_writes_to(Collection::Payments).await;
        let (headers, raw) = signed(&charge_success());

        let outcome = fx.reconciler.handle(&headers, &raw).await;

        assert!(matches!(outcome, ReconcileOutcome::Failed(_)));
        assert_eq!(fx.datastore.count(Collection::WebhookEvents).await, 0);
        assert!(event_types(&fx).await.contains(&"cashfree.webhook.processing_error".to_string()));

        fx.datastore.clear_failures().await;
        let retried = fx.reconciler.handle(&headers, &raw).await;
        assert!(matches!(retried, ReconcileOutcome::Applied(TransitionOutcome::PaymentSettled { .. })));
    }

    async fn redeliver_after_failure_on(collection: Collection) -> Fixture {
        let fx = fixture();
        seed_active(&fx).await;
        let (headers, raw) = signed(&charge_success());
        fx.datastore.fail_writes_to(collection).await;

        let outcome = fx.reconciler.handle(&headers, &raw).await;
        assert!(matches!(outcome, ReconcileOutcome::Failed(_)));
        assert_eq!(fx.datastore.count(Collection::WebhookEvents).await, 0);

        fx.datastore.clear_failures().await;
        let retried = fx.reconciler.handle(&headers, &raw).await;
        assert!(matches!(retried, ReconcileOutcome::Applied(TransitionOutcome::PaymentSettled { .. })));
        assert_eq!(fx.reconciler.handle(&headers, &raw).await, ReconcileOutcome::Duplicate);
        fx
    }

    async fn assert_credited_once(fx: &Fixture) {
        let enrollment = fx.datastore.get(Collection::Enrollments, "E1").await.unwrap().unwrap();
        assert_eq!(enrollment["paid_amount_minor"], 50_000);
        let stored = fx.store.get("mandate_E1").await.unwrap().unwrap().record;
        assert_eq!(stored.last_payment_status, Some(PaymentStatus::Success));
        assert!(stored.last_payment_date.is_some());
    }

    #[tokio::test]
    async fn failed_enrollment_credit_is_applied_on_redelivery() {
        let fx = redeliver_after_failure_on(Collection::Enrollments).await;
        assert_credited_once(&fx).await;
    }

    #[tokio::test]
    async fn failed_mandate_update_is_finished_on_redelivery() {
        let fx = redeliver_after_failure_on(Collection::Mandates).await;
        assert_credited_once(&fx).await;
    }

    #[tokio::test]
    async fn same_payment_under_new_event_time_after_partial_failure_credits_once() {
        let fx = redeliver_after_failure_on(Collection::Mandates).await;
        let mut later = charge_success();
        later["event_time"] = json!("2024-06-01T10:05:00Z");
        let (headers, raw) = signed(&later);

        let outcome = fx.reconciler.handle(&headers, &raw).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Applied(TransitionOutcome::PaymentAlreadySettled { .. })
        ));
        assert_credited_once(&fx).await;
    }

    #[tokio::test]
    async fn terminal_status_is_kept() {
        let fx = fixture();
        fx.store
            .insert(
                "mandate_E1",
                MandateRecord {
                    cf_subscription_id: Some("cf_1".to_string()),
                    subscription_status: Some(SubscriptionStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let (headers, raw) = signed(&json!({
            "type": "SUBSCRIPTION_STATUS_CHANGED",
            "event_time": "2024-06-02T10:00:00Z",
            "data": { "subscription_details": { "cf_subscription_id": "cf_1", "subscription_status": "ACTIVE" } }
        }));

        let outcome = fx.reconciler.handle(&headers, &raw).await;

        assert!(matches!(
            outcome,
            ReconcileOutcome::Applied(TransitionOutcome::StatusRejected { .. })
        ));
        let stored = fx.store.get("mandate_E1").await.unwrap().unwrap();
        assert_eq!(stored.record.subscription_status, Some(SubscriptionStatus::Completed));
    }

    #[tokio::test]
    async fn onboarding_status_reaches_merchant_and_user() {
        let fx = fixture();
        MerchantDirectory::new(fx.datastore.clone())
            .link(
                &UserId::new("uid-1").unwrap(),
                "M1",
                MerchantLink {
                    merchant_id: Some("M1".to_string()),
                    onboarding_status: Some("CREATED".to_string()),
                    raw: None,
                },
            )
            .await
            .unwrap();
        let (headers, raw) = signed(&json!({
            "type": "MERCHANT_ONBOARDING_STATUS",
            "event_time": "2024-06-02T10:00:00Z",
            "data": { "merchant_id": "M1", "onboarding_status": "ACTIVE" }
        }));

        let outcome = fx.reconciler.handle(&headers, &raw).await;

        assert_eq!(
            outcome,
            ReconcileOutcome::OnboardingUpdated {
                merchant_id: "M1".to_string()
            }
        );
        let user = fx.datastore.get(Collection::Users, "uid-1").await.unwrap().unwrap();
        assert_eq!(user["cashfree"]["onboarding_status"], "ACTIVE");
    }

    #[tokio::test]
    async fn non_subscription_events_are_ignored() {
        let fx = fixture();
        let (headers, raw) = signed(&json!({ "type": "SETTLEMENT_SUCCESS", "data": {} }));

        let outcome = fx.reconciler.handle(&headers, &raw).await;

        assert!(matches!(outcome, ReconcileOutcome::Ignored(_)));
    }
}
