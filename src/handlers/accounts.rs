//! Account read endpoints.
//!
//! This module implements the account-related API endpoints:
//! - GET /api/v1/accounts/{id}/balance - Current balance, optionally converted
//! - GET /api/v1/accounts/{id}/transactions - Transaction history

use axum::{
    Json,
    extract::{Path, Query, State, rejection::PathRejection},
};

use crate::{
    error::AppError,
    models::{
        balance::{BalanceQuery, BalanceResponse},
        transaction::{TransactionResponse, TransactionsQuery},
    },
    services::ledger_service::LedgerService,
};

/// Turn a malformed path segment into the standard error body.
pub(crate) fn account_id_from_path(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::InvalidRequest(e.body_text()))
}

/// Get the balance of an account.
///
/// # Endpoint
///
/// `GET /api/v1/accounts/{id}/balance?currency=USD`
///
/// # Query Parameters
///
/// - `currency` (optional) - Render the balance in this currency. The ledger
///   currency is returned unchanged; anything else goes through the rate source.
///
/// # Response
///
/// - **Success (200 OK)**: Returns the balance
/// - **Error (400)**: Invalid account id or currency code
/// - **Error (404)**: Account was never topped up
/// - **Error (503)**: Exchange rate unavailable
///
/// ```json
/// {
///   "account_id": 42,
///   "amount": "60.00",
///   "currency": "RUB",
///   "updated_at": "2025-12-20T10:00:00Z"
/// }
/// ```
pub async fn get_balance(
    State(ledger): State<LedgerService>,
    path: Result<Path<i64>, PathRejection>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account_id = account_id_from_path(path)?;
    let balance = ledger.get_balance(account_id).await?;

    // Conversion happens only after a successful read
    let balance = match query.currency.as_deref() {
        Some(currency) if !currency.trim().is_empty() => {
            ledger.convert_balance(&balance, currency).await?
        }
        _ => balance,
    };

    Ok(Json(balance.into()))
}

/// List the transactions of an account.
///
/// # Endpoint
///
/// `GET /api/v1/accounts/{id}/transactions?sort=date`
///
/// # Ordering
///
/// - no `sort` or `sort=` - insertion order (oldest first)
/// - `sort=date` - newest first
/// - `sort=amount` - largest amount first
///
/// Any other value returns 400 `invalid_sort_key`.
pub async fn get_transactions(
    State(ledger): State<LedgerService>,
    path: Result<Path<i64>, PathRejection>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let account_id = account_id_from_path(path)?;
    let transactions = ledger.get_transactions(account_id, &query.sort).await?;

    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}
