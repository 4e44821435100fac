//! Account balance data models and API request/response types.
//!
//! This module defines:
//! - `Balance`: Database entity holding one account's current balance
//! - `TopUpRequest` / `DebitRequest`: Request bodies for balance mutations
//! - `BalanceQuery`: Query string for balance lookups
//! - `BalanceResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::money::{MINOR_UNIT_DIGITS, Money};

/// Represents a balance record from the database.
///
/// # Database Table
///
/// Maps to the `balances` table. Each row:
/// - Is keyed by `account_id` (one balance per account, single currency)
/// - Is created implicitly by the first top-up
/// - Never goes below zero (enforced by the store and a CHECK constraint)
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Balance {
    /// Account this balance belongs to
    pub account_id: i64,

    /// Current amount, exact decimal
    pub amount: Money,

    /// Currency code (ISO 4217, 3 letters)
    pub currency: String,

    /// When the account was created (first top-up)
    pub created_at: DateTime<Utc>,

    /// When the balance last changed
    pub updated_at: DateTime<Utc>,
}

/// Request to top up (add money to) an account.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_id": 42,
///   "amount": "100.00"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub account_id: i64,

    /// Decimal string, parsed exactly
    pub amount: String,
}

/// Request to debit (remove money from) an account.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_id": 42,
///   "amount": "40.00"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct DebitRequest {
    pub account_id: i64,
    pub amount: String,
}

/// Query parameters of `GET /api/v1/accounts/{id}/balance`.
///
/// `currency` asks for the balance converted into another currency.
#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    pub currency: Option<String>,
}

/// Response body for balance endpoints.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_id": 42,
///   "amount": "60.00",
///   "currency": "RUB",
///   "updated_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account_id: i64,

    /// Amount rendered with two fractional digits
    pub amount: String,

    pub currency: String,

    pub updated_at: DateTime<Utc>,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            account_id: balance.account_id,
            amount: balance.amount.to_fixed(MINOR_UNIT_DIGITS),
            currency: balance.currency,
            updated_at: balance.updated_at,
        }
    }
}
