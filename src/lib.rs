//! Balance ledger.
//!
//! Per-account monetary balances with an append-only transaction history,
//! served over a JSON HTTP API.
//!
//! # Architecture
//!
//! - **Money**: exact decimals ([`models::money::Money`]), never floats
//! - **Store**: atomic single-account deltas ([`store::LedgerStore`]) backed by
//!   PostgreSQL or memory
//! - **Service**: top-up, debit, transfer and history ([`services::ledger_service::LedgerService`])
//! - **Rates**: pluggable exchange rate source used only for display
//! - **HTTP**: Axum handlers translating requests into service calls

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;
