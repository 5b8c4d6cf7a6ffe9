//! Mandate handlers - creation, authorization, manage actions and webhook
//! reconciliation.

mod authorize_mandate;
mod create_mandate;
mod manage_mandate;
mod reconcile_webhook;

pub use authorize_mandate::{AuthorizeMandateCommand, AuthorizeMandateHandler, AuthorizeMandateResult};
pub use create_mandate::{CreateMandateCommand, CreateMandateHandler, CreateMandateResult};
pub use manage_mandate::{ManageMandateCommand, ManageMandateHandler, ManageMandateResult};
pub use reconcile_webhook::{ReconcileOutcome, WebhookReconciler};
