//! Ledger storage.
//!
//! The store owns balances and the append-only transaction log. Its only
//! write path is [`LedgerStore::apply_delta`], which changes one account's
//! balance and appends the matching transaction record as one atomic unit.
//!
//! Two backends are provided:
//! - [`postgres::PgLedgerStore`]: row locks inside a database transaction
//! - [`memory::InMemoryLedgerStore`]: a per-account async mutex

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    error::AppError,
    models::{
        balance::Balance,
        money::Money,
        transaction::{Operation, Transaction, TransactionOrder},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Result of a committed balance change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDelta {
    /// Balance after the change
    pub balance: Balance,

    /// The record appended in the same atomic unit
    pub transaction: Transaction,
}

/// Durable, atomic single-account read-modify-write.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Current balance of an account, `None` if it was never topped up.
    async fn get_balance(&self, account_id: i64) -> Result<Option<Balance>, AppError>;

    /// Add `delta` to the balance and append one `operation` record.
    ///
    /// # Contract
    ///
    /// - A missing account is created with balance 0 when `delta > 0`;
    ///   otherwise the call fails with `AccountNotFound`.
    /// - If the new balance would be negative, nothing changes and the call
    ///   fails with `InsufficientFunds`.
    /// - If the new balance would exceed [`Money::MAX`], nothing changes and
    ///   the call fails with `InvalidAmount`.
    /// - Calls for the same account are serialized.
    /// - `deadline` is honored only before the commit point. Expiry fails with
    ///   `Timeout` and leaves no trace.
    async fn apply_delta(
        &self,
        account_id: i64,
        delta: Money,
        operation: Operation,
        deadline: Instant,
    ) -> Result<AppliedDelta, AppError>;

    /// All records of an account in the requested order.
    ///
    /// An account without history yields an empty list.
    async fn list_transactions(
        &self,
        account_id: i64,
        order: TransactionOrder,
    ) -> Result<Vec<Transaction>, AppError>;

    /// Check that the underlying medium is reachable.
    async fn ping(&self) -> Result<(), AppError>;

    /// Short name of the backend, reported by the health endpoint.
    fn backend_name(&self) -> &'static str;
}

/// Order records in place the way [`LedgerStore::list_transactions`] promises.
///
/// Ties are broken by id so repeated queries return the same sequence.
pub(crate) fn sort_transactions(transactions: &mut [Transaction], order: TransactionOrder) {
    match order {
        TransactionOrder::Insertion => transactions.sort_by_key(|t| t.id),
        TransactionOrder::DateDescending => transactions
            .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))),
        TransactionOrder::AmountDescending => {
            transactions.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.id.cmp(&b.id)))
        }
    }
}

/// Balance after applying `delta`, checked against both bounds.
pub(crate) fn next_balance(current: Money, delta: Money) -> Result<Money, AppError> {
    let new_amount = current
        .checked_add(delta)
        .filter(|amount| *amount <= Money::MAX)
        .ok_or_else(|| {
            AppError::InvalidAmount(format!("balance would exceed {}", Money::MAX))
        })?;
    if new_amount.is_negative() {
        return Err(AppError::InsufficientFunds);
    }
    Ok(new_amount)
}
