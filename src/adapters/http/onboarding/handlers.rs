//! HTTP handlers for merchant onboarding endpoints.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::error::ApiError;
use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::onboarding::{
    CreateOnboardingLinkCommand, CreateOnboardingLinkHandler, GetMerchantStatusHandler,
    GetMerchantStatusQuery, OnboardMerchantCommand, OnboardMerchantHandler,
};
use crate::application::services::{EventLog, MerchantDirectory};
use crate::domain::foundation::{AuthenticatedUser, UserId};
use crate::ports::{Datastore, PaymentGateway};

use super::dto::{
    MerchantStatusResponse, OnboardMerchantRequest, OnboardMerchantResponse,
    OnboardingLinkRequest, OnboardingLinkResponse,
};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingAppState {
    pub datastore: Arc<dyn Datastore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub audit_namespace: String,
}

impl OnboardingAppState {
    fn directory(&self) -> MerchantDirectory {
        MerchantDirectory::new(self.datastore.clone())
    }

    fn events(&self) -> EventLog {
        EventLog::new(self.datastore.clone(), self.audit_namespace.clone())
    }

    pub fn onboard_handler(&self) -> OnboardMerchantHandler {
        OnboardMerchantHandler::new(self.gateway.clone(), self.directory(), self.events())
    }

    pub fn link_handler(&self) -> CreateOnboardingLinkHandler {
        CreateOnboardingLinkHandler::new(self.gateway.clone(), self.directory(), self.events())
    }

    pub fn status_handler(&self) -> GetMerchantStatusHandler {
        GetMerchantStatusHandler::new(self.gateway.clone())
    }
}

/// The explicit body user, else the caller.
fn acting_user(requested: Option<&str>, caller: AuthenticatedUser) -> Result<UserId, ApiError> {
    match requested.filter(|id| !id.trim().is_empty()) {
        Some(raw) => Ok(UserId::new(raw)?),
        None => Ok(caller.id),
    }
}

/// POST /onboard
pub async fn onboard_merchant(
    State(state): State<OnboardingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<OnboardMerchantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = OnboardMerchantCommand {
        user_id: acting_user(request.user_id.as_deref(), user)?,
        merchant_info: request.merchant_info,
    };

    let result = state.onboard_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(OnboardMerchantResponse::from(result))))
}

/// POST /onboard/link
pub async fn create_onboarding_link(
    State(state): State<OnboardingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<OnboardingLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CreateOnboardingLinkCommand {
        user_id: acting_user(request.user_id.as_deref(), user)?,
        merchant_id: request.merchant_id,
        link_type: request.link_type,
        return_url: request.return_url,
    };

    let result = state.link_handler().handle(cmd).await?;

    Ok(Json(OnboardingLinkResponse::from(result)))
}

/// GET /onboard/link/callback - landing page after hosted onboarding.
pub async fn onboarding_callback() -> &'static str {
    "Onboarding complete. You may close this tab."
}

/// GET /debug/merchant/:merchant_id/status
pub async fn merchant_status(
    State(state): State<OnboardingAppState>,
    RequireAuth(_user): RequireAuth,
    Path(merchant_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .status_handler()
        .handle(GetMerchantStatusQuery { merchant_id })
        .await?;

    Ok(Json(MerchantStatusResponse::from(view)))
}
