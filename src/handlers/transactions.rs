//! Balance mutation HTTP handlers.
//!
//! This module implements the write endpoints:
//! - POST /api/v1/balance/top-up - Add money to an account
//! - POST /api/v1/balance/debit - Remove money from an account
//! - POST /api/v1/transfers - Move money between accounts

use axum::{Json, extract::State, extract::rejection::JsonRejection};

use crate::{
    error::AppError,
    models::{
        balance::{BalanceResponse, DebitRequest, TopUpRequest},
        transfer::{TransferRequest, TransferResponse},
    },
    services::ledger_service::{LedgerService, parse_amount},
};

/// Unwrap a JSON body, reporting malformed input in the standard error format.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(request)| request)
        .map_err(|e| AppError::InvalidRequest(e.body_text()))
}

/// Top up an account (add money).
///
/// The account is created on its first top-up.
///
/// # Request Body
///
/// ```json
/// {
///   "account_id": 42,
///   "amount": "100.00"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "account_id": 42,
///   "amount": "100.00",
///   "currency": "RUB",
///   "updated_at": "2025-12-21T16:00:00Z"
/// }
/// ```
pub async fn create_top_up(
    State(ledger): State<LedgerService>,
    payload: Result<Json<TopUpRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let request = body(payload)?;
    let amount = parse_amount(&request.amount)?;

    let balance = ledger.top_up(request.account_id, amount).await?;

    Ok(Json(balance.into()))
}

/// Debit an account (remove money).
///
/// # Endpoint
///
/// `POST /api/v1/balance/debit`
///
/// # Validation
///
/// - Account must exist
/// - Account must have sufficient balance (422 `insufficient_funds` otherwise)
pub async fn create_debit(
    State(ledger): State<LedgerService>,
    payload: Result<Json<DebitRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let request = body(payload)?;
    let amount = parse_amount(&request.amount)?;

    let balance = ledger.debit(request.account_id, amount).await?;

    Ok(Json(balance.into()))
}

/// Transfer money between accounts.
///
/// # Atomicity
///
/// Either both legs happen or, after a failed credit, the source debit is
/// reversed. A 500 `transfer_partially_failed` means the reversal failed too
/// and the request must not be retried.
///
/// # Validation
///
/// - Accounts must be different
/// - Source must exist and have sufficient balance
pub async fn create_transfer(
    State(ledger): State<LedgerService>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferResponse>, AppError> {
    let request = body(payload)?;
    let amount = parse_amount(&request.amount)?;

    let receipt = ledger
        .transfer(request.from_account_id, request.to_account_id, amount)
        .await?;

    Ok(Json(receipt.into()))
}
