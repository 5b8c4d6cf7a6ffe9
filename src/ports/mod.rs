//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `Datastore` - Document store with conditional merge and atomic increment
//! - `PaymentGateway` - Processor partner and PG APIs
//! - `SessionValidator` - Bearer-token verification

mod datastore;
mod payment_gateway;
mod session_validator;

pub use datastore::{
    from_document, to_document, Collection, Datastore, Document, Precondition, StoredDocument,
};
pub use payment_gateway::{GatewayError, GatewayErrorCode, PaymentGateway};
pub use session_validator::SessionValidator;
