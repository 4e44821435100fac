//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They validate input and drive the ledger store.

pub mod ledger_service;
pub mod rates;
