//! Mandate Gateway - recurring-payment mandates over a payment processor
//!
//! Creates and authorizes UPI AutoPay mandates through the Cashfree partner
//! and PG APIs, onboards sub-merchants, and reconciles signed processor
//! webhooks into a document store with exactly-once payment crediting.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
