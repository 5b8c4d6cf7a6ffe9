//! Payment records and enrollment credits.
//!
//! # Exactly-once credits
//!
//! A payment is claimed as SUCCESS with a compare-and-set merge guarded by
//! `payment_status != SUCCESS`. Only the caller whose claim applied goes on
//! to credit the enrollment, and the credit itself is a store-native atomic
//! increment. Two concurrent deliveries of the same success therefore
//! produce one credit.
//!
//! The remaining writes can fail after a claim, so settlement is resumable:
//!
//! - If the credit fails, the claim is released (SUCCESS back to PENDING)
//!   and a redelivery claims and credits again.
//! - If the credit applied but a later write failed, the payment stays
//!   SUCCESS without `settled_at`. A redelivery finishes the mandate update
//!   and the marker, and never credits again.
//!
//! A crash between claim and credit, or a failed release, still loses that
//! credit rather than applying it twice.

use std::sync::Arc;

use serde_json::Value;

use super::mandate_store::MandateHandle;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::mandate::{fields, Money, PaymentNotification, PaymentRecord, PaymentStatus};
use crate::ports::{from_document, to_document, Collection, Datastore, Document, Precondition};

#[derive(Clone)]
pub struct PaymentLedger {
    datastore: Arc<dyn Datastore>,
}

fn not_settled() -> Precondition {
    Precondition::field_not_equals(fields::PAYMENT_STATUS, PaymentStatus::Success.as_str())
}

impl PaymentLedger {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    fn base_record(notification: &PaymentNotification, mandate: &MandateHandle) -> PaymentRecord {
        PaymentRecord {
            payment_id: Some(notification.payment_id.clone()),
            cf_payment_id: notification.cf_payment_id.clone(),
            mandate_id: Some(mandate.id.clone()),
            subscription_id: mandate
                .record
                .subscription_id
                .clone()
                .or_else(|| mandate.record.cf_subscription_id.clone()),
            payment_type: notification.payment_type,
            amount_minor: notification.amount,
            currency: Some(notification.currency.clone()),
            updated_at: Some(Timestamp::now()),
            ..Default::default()
        }
    }

    /// Marks the payment SUCCESS. Returns true only for the call that made
    /// the transition.
    pub async fn claim_success(
        &self,
        notification: &PaymentNotification,
        mandate: &MandateHandle,
    ) -> Result<bool, DomainError> {
        let record = PaymentRecord {
            payment_status: Some(PaymentStatus::Success),
            ..Self::base_record(notification, mandate)
        };

        self.datastore
            .merge(
                Collection::Payments,
                &notification.payment_id,
                to_document(&record)?,
                not_settled(),
            )
            .await
    }

    /// Returns a claimed payment to PENDING after its credit failed, so the
    /// next delivery can claim it again.
    pub async fn release_claim(&self, payment_id: &str) -> Result<bool, DomainError> {
        let record = PaymentRecord {
            payment_status: Some(PaymentStatus::Pending),
            updated_at: Some(Timestamp::now()),
            ..Default::default()
        };

        self.datastore
            .merge(
                Collection::Payments,
                payment_id,
                to_document(&record)?,
                Precondition::field_equals(fields::PAYMENT_STATUS, PaymentStatus::Success.as_str()),
            )
            .await
    }

    /// Stamps `settled_at` once every side effect of the success is stored.
    pub async fn mark_settled(&self, payment_id: &str, at: Timestamp) -> Result<(), DomainError> {
        let record = PaymentRecord {
            settled_at: Some(at),
            ..Default::default()
        };

        self.datastore
            .merge(
                Collection::Payments,
                payment_id,
                to_document(&record)?,
                Precondition::Always,
            )
            .await
            .map(|_| ())
    }

    pub async fn find(&self, payment_id: &str) -> Result<Option<PaymentRecord>, DomainError> {
        self.datastore
            .get(Collection::Payments, payment_id)
            .await?
            .map(from_document::<PaymentRecord>)
            .transpose()
    }

    /// Records a failed or cancelled attempt unless the payment already
    /// succeeded.
    pub async fn record_unsuccessful(
        &self,
        notification: &PaymentNotification,
        mandate: &MandateHandle,
        status: PaymentStatus,
    ) -> Result<bool, DomainError> {
        let record = PaymentRecord {
            payment_status: Some(status),
            failure_reason: notification.failure_reason.clone(),
            ..Self::base_record(notification, mandate)
        };

        self.datastore
            .merge(
                Collection::Payments,
                &notification.payment_id,
                to_document(&record)?,
                not_settled(),
            )
            .await
    }

    /// Merges refund progress onto the payment.
    pub async fn record_refund(
        &self,
        notification: &PaymentNotification,
        mandate: &MandateHandle,
    ) -> Result<bool, DomainError> {
        let record = PaymentRecord {
            payment_id: Some(notification.payment_id.clone()),
            mandate_id: Some(mandate.id.clone()),
            refund: notification.refund.clone(),
            updated_at: Some(Timestamp::now()),
            ..Default::default()
        };

        self.datastore
            .merge(
                Collection::Payments,
                &notification.payment_id,
                to_document(&record)?,
                Precondition::Always,
            )
            .await
    }

    /// Adds `amount` to the enrollment's cumulative paid total and returns
    /// the new total.
    pub async fn credit_enrollment(
        &self,
        enrollment_id: &str,
        amount: Money,
        paid_at: Timestamp,
    ) -> Result<Money, DomainError> {
        let mut also_merge = Document::new();
        also_merge.insert(
            "last_payment_date".to_string(),
            Value::String(paid_at.to_rfc3339()),
        );

        let total = self
            .datastore
            .increment(
                Collection::Enrollments,
                enrollment_id,
                fields::PAID_AMOUNT,
                amount.minor_units(),
                also_merge,
            )
            .await?;

        tracing::info!(enrollment_id, credited = %amount, total, "Credited enrollment");
        Ok(Money::from_minor(total))
    }
}
