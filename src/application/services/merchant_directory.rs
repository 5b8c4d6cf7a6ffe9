//! Links between users and their processor merchant accounts.
//!
//! The link is stored twice: on `users/{user_id}` under `cashfree`, and as
//! `merchants/{merchant_id}` pointing back at the user.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::merchant::{MerchantLink, MerchantRecord, USER_MERCHANT_FIELD};
use crate::ports::{from_document, to_document, Collection, Datastore, Document, Precondition};

#[derive(Clone)]
pub struct MerchantDirectory {
    datastore: Arc<dyn Datastore>,
}

impl MerchantDirectory {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    /// Stores the merchant link on the user and the back-reference on the
    /// merchant.
    pub async fn link(
        &self,
        user_id: &UserId,
        merchant_id: &str,
        link: MerchantLink,
    ) -> Result<(), DomainError> {
        let record = MerchantRecord {
            user_id: Some(user_id.to_string()),
            onboarding_status: link.onboarding_status.clone(),
        };

        let mut user_patch = Document::new();
        user_patch.insert(
            USER_MERCHANT_FIELD.to_string(),
            Value::Object(to_document(&link)?),
        );
        self.datastore
            .merge(Collection::Users, user_id.as_str(), user_patch, Precondition::Always)
            .await?;
        self.datastore
            .merge(Collection::Merchants, merchant_id, to_document(&record)?, Precondition::Always)
            .await?;
        Ok(())
    }

    /// The user's merchant link, if onboarding has happened.
    pub async fn link_for_user(&self, user_id: &UserId) -> Result<Option<MerchantLink>, DomainError> {
        let user = match self.datastore.get(Collection::Users, user_id.as_str()).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        match user.get(USER_MERCHANT_FIELD) {
            Some(Value::Object(link)) => from_document(link.clone()).map(Some),
            _ => Ok(None),
        }
    }

    pub async fn merchant_id_for_user(&self, user_id: &UserId) -> Result<Option<String>, DomainError> {
        Ok(self
            .link_for_user(user_id)
            .await?
            .and_then(|link| link.merchant_id)
            .filter(|id| !id.trim().is_empty()))
    }

    /// Records a new onboarding status on the merchant and, when the owner is
    /// known, on the owner's link. Returns the owning user id.
    pub async fn update_onboarding_status(
        &self,
        merchant_id: &str,
        status: &str,
    ) -> Result<Option<UserId>, DomainError> {
        let record = MerchantRecord {
            user_id: None,
            onboarding_status: Some(status.to_string()),
        };
        self.datastore
            .merge(Collection::Merchants, merchant_id, to_document(&record)?, Precondition::Always)
            .await?;

        let owner = match self.datastore.get(Collection::Merchants, merchant_id).await? {
            Some(doc) => from_document::<MerchantRecord>(doc)?.user_id,
            None => None,
        };
        let user_id = match owner.map(UserId::new) {
            Some(Ok(user_id)) => user_id,
            _ => {
                tracing::warn!(merchant_id, "Onboarding status for merchant without known owner");
                return Ok(None);
            }
        };

        let mut link = self.link_for_user(&user_id).await?.unwrap_or_default();
        link.merchant_id = Some(merchant_id.to_string());
        link.onboarding_status = Some(status.to_string());
        let mut user_patch = Document::new();
        user_patch.insert(
            USER_MERCHANT_FIELD.to_string(),
            Value::Object(to_document(&link)?),
        );
        self.datastore
            .merge(Collection::Users, user_id.as_str(), user_patch, Precondition::Always)
            .await?;

        Ok(Some(user_id))
    }
}
