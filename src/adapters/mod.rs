//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `datastore` - Document storage (in-memory, PostgreSQL)
//! - `cashfree` - Payment processor client and its mock
//! - `auth` - Bearer-token validation (OIDC, mock)
//! - `http` - axum routes, DTOs and middleware

pub mod auth;
pub mod cashfree;
pub mod datastore;
pub mod http;

pub use auth::{MockSessionValidator, OidcConfig, OidcSessionValidator};
pub use cashfree::{CashfreeConfig, CashfreeGatewayAdapter, MockPaymentGateway};
pub use datastore::{InMemoryDatastore, PostgresDatastore};
