//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: Immutable ledger record written with every balance change
//! - `Operation`: What kind of mutation produced a record
//! - `TransactionOrder`: Supported orderings of an account's history
//! - `TransactionResponse`: Response body returned to clients

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::money::{MINOR_UNIT_DIGITS, Money};

/// Tag describing which operation produced a transaction record.
///
/// Stored as snake_case text in the `operation` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    TopUp,
    Debit,
    TransferIn,
    TransferOut,
    /// Compensating credit issued when the second leg of a transfer fails
    TransferReversal,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::TopUp => "top_up",
            Operation::Debit => "debit",
            Operation::TransferIn => "transfer_in",
            Operation::TransferOut => "transfer_out",
            Operation::TransferReversal => "transfer_reversal",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_up" => Ok(Operation::TopUp),
            "debit" => Ok(Operation::Debit),
            "transfer_in" => Ok(Operation::TransferIn),
            "transfer_out" => Ok(Operation::TransferOut),
            "transfer_reversal" => Ok(Operation::TransferReversal),
            other => Err(AppError::Internal(format!(
                "unknown operation tag {other:?} in transaction log"
            ))),
        }
    }
}

/// Represents a transaction record.
///
/// # Database Table
///
/// Maps to the `transactions` table. Each record:
/// - Has a monotonically assigned id
/// - Carries a signed amount (positive credit, negative debit)
/// - Is never updated or deleted
///
/// For every account, the sum of its records' amounts equals its balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub amount: Money,
    pub operation: Operation,
    pub created_at: DateTime<Utc>,
}

/// Order in which an account's transactions are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionOrder {
    /// Oldest first, as recorded
    #[default]
    Insertion,
    /// Newest first
    DateDescending,
    /// Largest amount first
    AmountDescending,
}

impl TransactionOrder {
    /// Parse the `sort` query value: `""`, `"date"` or `"amount"`.
    pub fn from_sort_key(key: &str) -> Result<Self, AppError> {
        match key {
            "" => Ok(TransactionOrder::Insertion),
            "date" => Ok(TransactionOrder::DateDescending),
            "amount" => Ok(TransactionOrder::AmountDescending),
            other => Err(AppError::InvalidSortKey(other.to_string())),
        }
    }
}

/// Query parameters of `GET /api/v1/accounts/{id}/transactions`.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    #[serde(default)]
    pub sort: String,
}

/// Response returned for transaction listings.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": 17,
///   "account_id": 42,
///   "amount": "-40.00",
///   "operation": "debit",
///   "created_at": "2025-12-21T16:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: i64,
    pub account_id: i64,
    pub amount: String,
    pub operation: Operation,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            account_id: transaction.account_id,
            amount: transaction.amount.to_fixed(MINOR_UNIT_DIGITS),
            operation: transaction.operation,
            created_at: transaction.created_at,
        }
    }
}
