//! Datastore adapters.
//!
//! - `InMemoryDatastore` - Process-local store for tests and keyless development
//! - `PostgresDatastore` - JSONB document table

mod in_memory;
mod postgres;

pub use in_memory::InMemoryDatastore;
pub use postgres::PostgresDatastore;
