//! Error types and HTTP error response handling.
//!
//! This module defines every failure the ledger can report and how each one
//! is converted into an HTTP response with a status code and JSON body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::money::Money;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Input Errors**: `InvalidAccount`, `InvalidAmount`, `SameAccount`,
///   `InvalidSortKey`, `AccountNotFound`. Never retried.
/// - **Business Rule Errors**: `InsufficientFunds`.
/// - **Transient Errors**: `Timeout`, `RateUnavailable`. Safe to retry the whole operation.
/// - **Fatal Errors**: `TransferPartiallyFailed`. Needs an operator.
/// - **Infrastructure Errors**: `Database`, `Internal`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Account id is zero or negative.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid account id")]
    InvalidAccount,

    /// Amount is missing, malformed, not positive or too precise.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transfer source and destination are the same account.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Cannot transfer to the same account")]
    SameAccount,

    /// Transaction listing was requested with an unknown sort key.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid sort key: {0:?}")]
    InvalidSortKey(String),

    /// Request body or parameters are invalid in some other way.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Requested account does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Account not found")]
    AccountNotFound,

    /// The mutation would leave the balance negative.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// The operation did not reach its commit point before the deadline.
    ///
    /// Nothing was committed. Returns HTTP 504 Gateway Timeout.
    #[error("Operation timed out")]
    Timeout,

    /// A transfer debited the source, failed to credit the destination and
    /// then failed to reverse the debit.
    ///
    /// Must be surfaced to an operator. Retrying could double-compensate.
    /// Returns HTTP 500 Internal Server Error.
    #[error(
        "Transfer of {amount} from account {from_account_id} to account {to_account_id} partially failed: {reason}"
    )]
    TransferPartiallyFailed {
        from_account_id: i64,
        to_account_id: i64,
        amount: Money,
        reason: String,
    },

    /// Exchange rate source could not be reached or its answer could not be parsed.
    ///
    /// Returns HTTP 503 Service Unavailable.
    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),

    /// Database operation failed (e.g., connection error, query error).
    ///
    /// Returns HTTP 500 and hides details from the client.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unexpected failure outside the database (e.g., a worker task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the caller may safely retry the whole operation.
    ///
    /// Retry policy belongs to the caller. The ledger never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Timeout | AppError::RateUnavailable(_))
    }

    /// Stable machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidAccount => "invalid_account",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::SameAccount => "same_account",
            AppError::InvalidSortKey(_) => "invalid_sort_key",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::AccountNotFound => "account_not_found",
            AppError::InsufficientFunds => "insufficient_funds",
            AppError::Timeout => "timeout",
            AppError::TransferPartiallyFailed { .. } => "transfer_partially_failed",
            AppError::RateUnavailable(_) => "rate_unavailable",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "insufficient_funds",
///     "message": "Insufficient funds"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            AppError::InvalidAccount
            | AppError::InvalidAmount(_)
            | AppError::SameAccount
            | AppError::InvalidSortKey(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::AccountNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::InsufficientFunds => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::Timeout => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::RateUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::TransferPartiallyFailed { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Transfer partially failed and requires operator intervention".to_string(),
            ),
            AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
