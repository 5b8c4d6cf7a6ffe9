//! HTTP adapter for mandate endpoints.
//!
//! - `POST /mandate/create` - Create a mandate for an enrollment
//! - `POST /mandate/authorize` - Raise the authorization payment
//! - `POST /mandate/:subscription_id/manage` - Cancel, pause or activate
//! - `POST /webhook` - Processor notifications

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::MandateAppState;
pub use routes::{mandate_routes, webhook_routes};
