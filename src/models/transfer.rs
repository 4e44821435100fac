//! Transfer request and receipt.
//!
//! A transfer is not stored as its own entity. It becomes a `transfer_out`
//! record on the source account and a `transfer_in` record on the destination.

use serde::{Deserialize, Serialize};

use crate::models::money::{MINOR_UNIT_DIGITS, Money};

/// Request to transfer money between accounts.
///
/// # JSON Example
///
/// ```json
/// {
///   "from_account_id": 42,
///   "to_account_id": 7,
///   "amount": "50.00"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: String,
}

/// Outcome of a completed transfer, with both balances after the move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: Money,
    pub from_balance: Money,
    pub to_balance: Money,
}

/// Response body for `POST /api/v1/transfers`.
///
/// # JSON Example
///
/// ```json
/// {
///   "from_account_id": 42,
///   "to_account_id": 7,
///   "amount": "50.00",
///   "from_balance": "0.00",
///   "to_balance": "50.00",
///   "status": "completed"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferResponse {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: String,
    pub from_balance: String,
    pub to_balance: String,
    pub status: String,
}

impl From<TransferReceipt> for TransferResponse {
    fn from(receipt: TransferReceipt) -> Self {
        Self {
            from_account_id: receipt.from_account_id,
            to_account_id: receipt.to_account_id,
            amount: receipt.amount.to_fixed(MINOR_UNIT_DIGITS),
            from_balance: receipt.from_balance.to_fixed(MINOR_UNIT_DIGITS),
            to_balance: receipt.to_balance.to_fixed(MINOR_UNIT_DIGITS),
            status: "completed".to_string(),
        }
    }
}
