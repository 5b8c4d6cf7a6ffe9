//! Status and payment mutations of an existing mandate.
//!
//! Every status write goes through `request_status`, which consults the
//! transition table and then writes with a compare-and-set on the status it
//! observed. A concurrent writer that changed the status in between makes
//! the write miss, and the request is re-evaluated against the fresh value.

use serde_json::{json, Value};

use super::mandate_store::{MandateHandle, MandateStore};
use super::payment_ledger::PaymentLedger;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::mandate::{
    fields, identifiers, AuthStatus, GatewayWebhook, MandateRecord, Money, PaymentNotification,
    PaymentStatus, PaymentType, StatusChange, SubscriptionStatus, WebhookEventType,
};
use crate::ports::Precondition;

/// Compare-and-set attempts before a status write is reported as a conflict.
pub const STATUS_WRITE_ATTEMPTS: usize = 3;

/// What a mutation did to the mandate.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Status moved along an allowed edge.
    StatusChanged {
        from: Option<SubscriptionStatus>,
        to: SubscriptionStatus,
    },
    /// Same non-terminal status reported again; other fields refreshed.
    StatusRefreshed(SubscriptionStatus),
    /// Transition not allowed; nothing written.
    StatusRejected {
        from: Option<SubscriptionStatus>,
        to: SubscriptionStatus,
    },
    AuthRecorded(AuthStatus),
    /// Settlement of a payment completed. `credited` is `None` when an
    /// earlier delivery already applied the credit.
    PaymentSettled {
        payment_id: String,
        credited: Option<Money>,
    },
    /// Success already recorded by an earlier delivery.
    PaymentAlreadySettled { payment_id: String },
    PaymentUnsuccessful {
        payment_id: String,
        status: PaymentStatus,
    },
    RefundRecorded { payment_id: String },
    /// Nothing to apply.
    Ignored(String),
}

impl TransitionOutcome {
    /// Short label for logs and audit payloads.
    pub fn label(&self) -> &'static str {
        match self {
            TransitionOutcome::StatusChanged { .. } => "status_changed",
            TransitionOutcome::StatusRefreshed(_) => "status_refreshed",
            TransitionOutcome::StatusRejected { .. } => "status_rejected",
            TransitionOutcome::AuthRecorded(_) => "auth_recorded",
            TransitionOutcome::PaymentSettled { .. } => "payment_settled",
            TransitionOutcome::PaymentAlreadySettled { .. } => "payment_already_settled",
            TransitionOutcome::PaymentUnsuccessful { .. } => "payment_unsuccessful",
            TransitionOutcome::RefundRecorded { .. } => "refund_recorded",
            TransitionOutcome::Ignored(_) => "ignored",
        }
    }
}

#[derive(Clone)]
pub struct MandateLifecycle {
    store: MandateStore,
    payments: PaymentLedger,
}

impl MandateLifecycle {
    pub fn new(store: MandateStore, payments: PaymentLedger) -> Self {
        Self { store, payments }
    }

    /// Requests a move to `target`, merging `patch` along with the status.
    ///
    /// A rejected transition drops the whole patch.
    ///
    /// # Errors
    ///
    /// `Conflict` if the status kept changing underneath for
    /// `STATUS_WRITE_ATTEMPTS` attempts, or the mandate disappeared.
    pub async fn request_status(
        &self,
        handle: &MandateHandle,
        target: SubscriptionStatus,
        patch: MandateRecord,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut observed = handle.record.subscription_status;

        for attempt in 1..=STATUS_WRITE_ATTEMPTS {
            let change = SubscriptionStatus::evaluate(observed, target);
            if change == StatusChange::Rejected {
                tracing::warn!(
                    mandate_id = %handle.id,
                    from = ?observed,
                    to = %target,
                    "Rejected invalid status transition"
                );
                return Ok(TransitionOutcome::StatusRejected {
                    from: observed,
                    to: target,
                });
            }

            let expected = observed.map_or(Value::Null, |s| json!(s.as_str()));
            let write = MandateRecord {
                subscription_status: Some(target),
                ..patch.clone()
            };
            let applied = self
                .store
                .update(
                    &handle.id,
                    write,
                    Precondition::field_equals(fields::SUBSCRIPTION_STATUS, expected),
                )
                .await?;

            if applied {
                return Ok(match change {
                    StatusChange::Refresh => TransitionOutcome::StatusRefreshed(target),
                    _ => {
                        tracing::info!(mandate_id = %handle.id, from = ?observed, to = %target, "Mandate status changed");
                        TransitionOutcome::StatusChanged {
                            from: observed,
                            to: target,
                        }
                    }
                });
            }

            tracing::debug!(mandate_id = %handle.id, attempt, "Status changed concurrently, re-reading");
            observed = match self.store.get(&handle.id).await? {
                Some(fresh) => fresh.record.subscription_status,
                None => {
                    return Err(DomainError::new(
                        ErrorCode::Conflict,
                        format!("mandate {} disappeared during status update", handle.id),
                    ))
                }
            };
        }

        Err(DomainError::new(
            ErrorCode::Conflict,
            format!(
                "status of mandate {} kept changing, gave up after {} attempts",
                handle.id, STATUS_WRITE_ATTEMPTS
            ),
        ))
    }

    /// Applies a verified, parsed webhook to an already resolved mandate.
    pub async fn apply_webhook_transition(
        &self,
        handle: &MandateHandle,
        webhook: &GatewayWebhook,
    ) -> Result<TransitionOutcome, DomainError> {
        match &webhook.event_type {
            WebhookEventType::SubscriptionStatusChanged => self.apply_status_change(handle, webhook).await,
            WebhookEventType::SubscriptionAuthStatus => self.apply_auth_status(handle, webhook).await,
            WebhookEventType::SubscriptionPaymentSuccess => self.apply_payment_success(handle, webhook).await,
            WebhookEventType::SubscriptionPaymentFailed => {
                self.apply_payment_unsuccessful(handle, webhook, PaymentStatus::Failed).await
            }
            WebhookEventType::SubscriptionPaymentCancelled => {
                self.apply_payment_unsuccessful(handle, webhook, PaymentStatus::Cancelled).await
            }
            WebhookEventType::SubscriptionRefundStatus => self.apply_refund(handle, webhook).await,
            other if other.is_informational() => {
                Ok(TransitionOutcome::Ignored(format!("{} is informational", other)))
            }
            other => Ok(TransitionOutcome::Ignored(format!("no handler for {}", other))),
        }
    }

    async fn apply_status_change(
        &self,
        handle: &MandateHandle,
        webhook: &GatewayWebhook,
    ) -> Result<TransitionOutcome, DomainError> {
        let raw = match identifiers::SUBSCRIPTION_STATUS.extract(&webhook.payload) {
            Some(raw) => raw,
            None => return Ok(TransitionOutcome::Ignored("status missing from payload".to_string())),
        };
        let target: SubscriptionStatus = match raw.parse() {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(mandate_id = %handle.id, status = %raw, "Unknown subscription status");
                return Ok(TransitionOutcome::Ignored(format!("unknown status {}", raw)));
            }
        };

        let keys = webhook.subscription_keys();
        let patch = MandateRecord {
            next_schedule_date: identifiers::NEXT_SCHEDULE_DATE.extract(&webhook.payload),
            raw_cf_response: Some(webhook.data().clone()),
            subscription_id: handle
                .record
                .subscription_id
                .is_none()
                .then_some(keys.subscription_id)
                .flatten(),
            cf_subscription_id: handle
                .record
                .cf_subscription_id
                .is_none()
                .then_some(keys.cf_subscription_id)
                .flatten(),
            ..Default::default()
        };

        self.request_status(handle, target, patch).await
    }

    async fn apply_auth_status(
        &self,
        handle: &MandateHandle,
        webhook: &GatewayWebhook,
    ) -> Result<TransitionOutcome, DomainError> {
        let status = identifiers::AUTH_STATUS
            .extract(&webhook.payload)
            .map(|raw| AuthStatus::from_payment_status(&raw))
            .unwrap_or(AuthStatus::Pending);

        let patch = MandateRecord {
            auth_status: Some(status),
            auth_payment_id: webhook.payment_id(),
            ..Default::default()
        };
        let applied = self
            .store
            .update(
                &handle.id,
                patch,
                Precondition::field_not_equals(fields::AUTH_STATUS, AuthStatus::Success.as_str()),
            )
            .await?;

        if applied {
            Ok(TransitionOutcome::AuthRecorded(status))
        } else {
            Ok(TransitionOutcome::Ignored("authorization already succeeded".to_string()))
        }
    }

    async fn apply_payment_success(
        &self,
        handle: &MandateHandle,
        webhook: &GatewayWebhook,
    ) -> Result<TransitionOutcome, DomainError> {
        let payment = match webhook.payment() {
            Some(payment) => payment,
            None => return Ok(TransitionOutcome::Ignored("payment_id missing from payload".to_string())),
        };

        let paid_at = Timestamp::now();
        if !self.payments.claim_success(&payment, handle).await? {
            let unfinished = self
                .payments
                .find(&payment.payment_id)
                .await?
                .is_some_and(|record| record.needs_settlement());
            if !unfinished {
                tracing::info!(payment_id = %payment.payment_id, "Payment success already recorded");
                return Ok(TransitionOutcome::PaymentAlreadySettled {
                    payment_id: payment.payment_id,
                });
            }

            tracing::info!(payment_id = %payment.payment_id, "Finishing settlement of an already credited payment");
            self.finish_settlement(handle, &payment, paid_at).await?;
            return Ok(TransitionOutcome::PaymentSettled {
                payment_id: payment.payment_id,
                credited: None,
            });
        }

        let credited = match (payment.payment_type, handle.record.enrollment_id.as_deref(), payment.amount) {
            (Some(PaymentType::Charge), Some(enrollment_id), Some(amount)) => {
                if let Err(err) = self.payments.credit_enrollment(enrollment_id, amount, paid_at).await {
                    self.release_claim(&payment.payment_id).await;
                    return Err(err);
                }
                Some(amount)
            }
            (Some(PaymentType::Charge), None, _) => {
                tracing::warn!(mandate_id = %handle.id, payment_id = %payment.payment_id, "Charge settled on mandate without enrollment, nothing credited");
                None
            }
            _ => None,
        };

        self.finish_settlement(handle, &payment, paid_at).await?;

        Ok(TransitionOutcome::PaymentSettled {
            payment_id: payment.payment_id,
            credited,
        })
    }

    /// Mandate bookkeeping for a claimed success, then the settled marker.
    /// Safe to repeat; a redelivery runs it again when either write failed.
    async fn finish_settlement(
        &self,
        handle: &MandateHandle,
        payment: &PaymentNotification,
        paid_at: Timestamp,
    ) -> Result<(), DomainError> {
        let patch = MandateRecord {
            last_payment_status: Some(PaymentStatus::Success),
            last_payment_date: Some(paid_at),
            auth_status: (payment.payment_type == Some(PaymentType::Auth)).then_some(AuthStatus::Success),
            ..Default::default()
        };
        self.store.update(&handle.id, patch, Precondition::Always).await?;
        self.payments.mark_settled(&payment.payment_id, paid_at).await
    }

    async fn release_claim(&self, payment_id: &str) {
        match self.payments.release_claim(payment_id).await {
            Ok(_) => {
                tracing::warn!(payment_id, "Credit failed, payment claim released for redelivery");
            }
            Err(e) => {
                tracing::error!(payment_id, error = %e, "Credit failed and claim could not be released, credit lost");
            }
        }
    }

    async fn apply_payment_unsuccessful(
        &self,
        handle: &MandateHandle,
        webhook: &GatewayWebhook,
        default_status: PaymentStatus,
    ) -> Result<TransitionOutcome, DomainError> {
        let payment = match webhook.payment() {
            Some(payment) => payment,
            None => return Ok(TransitionOutcome::Ignored("payment_id missing from payload".to_string())),
        };
        let status = match payment.payment_status {
            Some(status @ (PaymentStatus::Failed | PaymentStatus::Cancelled)) => status,
            _ => default_status,
        };

        if !self.payments.record_unsuccessful(&payment, handle, status).await? {
            return Ok(TransitionOutcome::PaymentAlreadySettled {
                payment_id: payment.payment_id,
            });
        }

        let patch = MandateRecord {
            last_payment_status: Some(status),
            ..Default::default()
        };
        self.store.update(&handle.id, patch, Precondition::Always).await?;

        tracing::info!(mandate_id = %handle.id, payment_id = %payment.payment_id, status = %status, "Recorded unsuccessful payment");
        Ok(TransitionOutcome::PaymentUnsuccessful {
            payment_id: payment.payment_id,
            status,
        })
    }

    async fn apply_refund(
        &self,
        handle: &MandateHandle,
        webhook: &GatewayWebhook,
    ) -> Result<TransitionOutcome, DomainError> {
        let payment = match webhook.payment() {
            Some(payment) if payment.refund.is_some() => payment,
            _ => return Ok(TransitionOutcome::Ignored("refund details missing from payload".to_string())),
        };

        self.payments.record_refund(&payment, handle).await?;
        Ok(TransitionOutcome::RefundRecorded {
            payment_id: payment.payment_id,
        })
    }
}
