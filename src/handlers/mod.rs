//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, query string)
//! 2. Calls the ledger service
//! 3. Returns HTTP response (JSON, status code)

/// Balance and history reads
pub mod accounts;
/// Health and readiness probes
pub mod health;
/// Top-up, debit and transfer
pub mod transactions;
