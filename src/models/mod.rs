//! Data models representing ledger entities.
//!
//! This module contains the money type, the structures that map to database
//! tables, and the request/response bodies of the HTTP API.

/// Account balance model
pub mod balance;
/// Exact decimal money type
pub mod money;
/// Transaction record model
pub mod transaction;
/// Transfer request and receipt
pub mod transfer;
