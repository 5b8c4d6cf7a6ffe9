//! ManageMandateHandler - Cancels, pauses or re-activates a mandate.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::application::services::{
    EventLog, IdentifierResolver, MandateLifecycle, MandateStore, ResolvePolicy, TransitionOutcome,
};
use crate::domain::foundation::MerchantId;
use crate::domain::mandate::{
    identifiers::response, AuditEventKind, ManageAction, MandateError, MandateRecord,
    SubscriptionStatus,
};
use crate::ports::{PaymentGateway, Precondition};

/// Command to apply a manage action.
#[derive(Debug, Clone)]
pub struct ManageMandateCommand {
    /// Any identifier the mandate is known by.
    pub subscription_id: String,
    pub merchant_id: String,
    pub action: ManageAction,
}

#[derive(Debug, Clone)]
pub struct ManageMandateResult {
    pub mandate_id: String,
    pub outcome: TransitionOutcome,
    pub response: Value,
}

pub struct ManageMandateHandler {
    gateway: Arc<dyn PaymentGateway>,
    store: MandateStore,
    resolver: IdentifierResolver,
    lifecycle: MandateLifecycle,
    events: EventLog,
}

impl ManageMandateHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: MandateStore,
        resolver: IdentifierResolver,
        lifecycle: MandateLifecycle,
        events: EventLog,
    ) -> Self {
        Self {
            gateway,
            store,
            resolver,
            lifecycle,
            events,
        }
    }

    pub async fn handle(&self, cmd: ManageMandateCommand) -> Result<ManageMandateResult, MandateError> {
        let merchant_id = MerchantId::new(cmd.merchant_id)?;
        let subscription_id = cmd.subscription_id.trim();
        if subscription_id.is_empty() {
            return Err(MandateError::validation("subscription_id", "is required"));
        }

        // 1. Ask the processor first; nothing is recorded if it refuses
        let response = self
            .gateway
            .manage_subscription(merchant_id.as_str(), subscription_id, cmd.action)
            .await
            .map_err(|e| {
                tracing::error!(subscription_id, action = %cmd.action, error = %e, "Manage call failed");
                MandateError::from(e)
            })?;

        // 2. Locate the mandate, creating a stub for subscriptions made elsewhere
        let mandate = self
            .resolver
            .resolve(subscription_id, ResolvePolicy::UpsertOnMiss)
            .await?
            .ok_or_else(|| MandateError::infrastructure(format!("no mandate for {}", subscription_id)))?;

        // 3. Record the action regardless of the status outcome
        let patch = MandateRecord {
            last_manage_action: Some(cmd.action.as_str().to_string()),
            raw_cf_response: Some(response.clone()),
            merchant_id: mandate
                .record
                .merchant_id
                .is_none()
                .then(|| merchant_id.to_string()),
            ..Default::default()
        };
        self.store.update(&mandate.id, patch, Precondition::Always).await?;

        // 4. Move the status through the transition table
        let target = response::SUBSCRIPTION_STATUS
            .extract(&response)
            .and_then(|s| s.parse::<SubscriptionStatus>().ok())
            .unwrap_or_else(|| cmd.action.implied_status());
        let outcome = self
            .lifecycle
            .request_status(&mandate, target, MandateRecord::default())
            .await?;

        // 5. Audit
        self.events
            .record(
                AuditEventKind::MandateManage,
                json!({
                    "mandate_id": mandate.id,
                    "subscription_id": subscription_id,
                    "action": cmd.action.as_str(),
                    "outcome": outcome.label(),
                }),
            )
            .await;

        Ok(ManageMandateResult {
            mandate_id: mandate.id,
            outcome,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cashfree::{GatewayOperation, MockPaymentGateway};
    use crate::adapters::datastore::InMemoryDatastore;
    use crate::application::services::PaymentLedger;
    use crate::ports::{Collection, Datastore, GatewayError};
    use SubscriptionStatus::*;

    struct Fixture {
        datastore: Arc<InMemoryDatastore>,
        gateway: MockPaymentGateway,
        store: MandateStore,
        handler: ManageMandateHandler,
    }

    fn fixture() -> Fixture {
        let datastore = Arc::new(InMemoryDatastore::new());
        let gateway = MockPaymentGateway::new();
        let store = MandateStore::new(datastore.clone());
        let handler = ManageMandateHandler::new(
            Arc::new(gateway.clone()),
            store.clone(),
            IdentifierResolver::new(store.clone()),
            MandateLifecycle::new(store.clone(), PaymentLedger::new(datastore.clone())),
            EventLog::new(datastore.clone(), "cashfree"),
        );
        Fixture {
            datastore,
            gateway,
            store,
            handler,
        }
    }

    async fn seed(fx: &Fixture, status: SubscriptionStatus) {
        fx.store
            .insert(
                "mandate_E1",
                MandateRecord {
                    subscription_id: Some("sub_1".to_string()),
                    cf_subscription_id: Some("cf_1".to_string()),
                    subscription_status: Some(status),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    fn command(action: ManageAction) -> ManageMandateCommand {
        ManageMandateCommand {
            subscription_id: "cf_1".to_string(),
            merchant_id: "M1".to_string(),
            action,
        }
    }

    async fn stored(fx: &Fixture, id: &str) -> serde_json::Map<String, Value> {
        fx.datastore.get(Collection::Mandates, id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn pause_moves_active_mandate_on_hold() {
        let fx = fixture();
        seed(&fx, Active).await;

        let result = fx.handler.handle(command(ManageAction::Pause)).await.unwrap();

        assert_eq!(result.mandate_id, "mandate_E1");
        assert_eq!(
            result.outcome,
            TransitionOutcome::StatusChanged {
                from: Some(Active),
                to: OnHold
            }
        );
        let doc = stored(&fx, "mandate_E1").await;
        assert_eq!(doc["subscription_status"], "ON_HOLD");
        assert_eq!(doc["last_manage_action"], "PAUSE");
    }

    #[tokio::test]
    async fn response_status_takes_precedence_over_action() {
        let fx = fixture();
        seed(&fx, BankApprovalPending).await;
        fx.gateway.push_response(
            GatewayOperation::ManageSubscription,
            json!({ "subscription_status": "CANCELLED" }),
        );

        let result = fx.handler.handle(command(ManageAction::Pause)).await.unwrap();

        assert!(matches!(result.outcome, TransitionOutcome::StatusChanged { to: Cancelled, .. }));
    }

    #[tokio::test]
    async fn disallowed_status_still_records_action() {
        let fx = fixture();
        seed(&fx, Completed).await;

        let result = fx.handler.handle(command(ManageAction::Activate)).await.unwrap();

        assert!(matches!(result.outcome, TransitionOutcome::StatusRejected { .. }));
        let doc = stored(&fx, "mandate_E1").await;
        assert_eq!(doc["subscription_status"], "COMPLETED");
        assert_eq!(doc["last_manage_action"], "ACTIVATE");
    }

    #[tokio::test]
    async fn unknown_subscription_gets_a_stub() {
        let fx = fixture();

        let result = fx
            .handler
            .handle(ManageMandateCommand {
                subscription_id: "sub_elsewhere".to_string(),
                ..command(ManageAction::Cancel)
            })
            .await
            .unwrap();

        assert_eq!(result.mandate_id, "sub_elsewhere");
        let doc = stored(&fx, "sub_elsewhere").await;
        assert_eq!(doc["subscription_status"], "CANCELLED");
        assert_eq!(doc["merchantId"], "M1");
    }

    #[tokio::test]
    async fn processor_failure_records_nothing() {
        let fx = fixture();
        seed(&fx, Active).await;
        fx.gateway.fail(
            GatewayOperation::ManageSubscription,
            GatewayError::rejected(404, "subscription not found"),
        );

        let err = fx.handler.handle(command(ManageAction::Cancel)).await.unwrap_err();

        assert!(matches!(err, MandateError::Upstream { status: Some(404), .. }));
        assert!(!stored(&fx, "mandate_E1").await.contains_key("last_manage_action"));
        assert_eq!(fx.datastore.count(Collection::Events).await, 0);
    }

    #[tokio::test]
    async fn manage_is_audited_with_outcome() {
        let fx = fixture();
        seed(&fx, Active).await;

        fx.handler.handle(command(ManageAction::Cancel)).await.unwrap();

        let events = fx.datastore.all(Collection::Events).await;
        assert_eq!(events[0].data["type"], "cashfree.mandate.manage");
        // ACTIVE cannot be CANCELLED directly; only CUSTOMER_CANCELLED is allowed
        assert_eq!(events[0].data["payload"]["outcome"], "status_rejected");
    }
}
