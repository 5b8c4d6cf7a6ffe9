//! Application services shared by the command handlers.
//!
//! Each wraps one concern over the `Datastore` port: typed mandate access,
//! identifier resolution, the status state machine, payment bookkeeping,
//! the webhook dedup ledger, merchant links and the audit trail.

mod event_log;
mod identifier_resolver;
mod mandate_lifecycle;
mod mandate_store;
mod merchant_directory;
mod payment_ledger;
mod webhook_ledger;

pub use event_log::EventLog;
pub use identifier_resolver::{IdentifierResolver, ResolvePolicy};
pub use mandate_lifecycle::{MandateLifecycle, TransitionOutcome, STATUS_WRITE_ATTEMPTS};
pub use mandate_store::{MandateHandle, MandateStore};
pub use merchant_directory::MerchantDirectory;
pub use payment_ledger::PaymentLedger;
pub use webhook_ledger::WebhookLedger;
