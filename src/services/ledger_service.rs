//! Ledger service - Core business logic for balances.
//!
//! This service handles:
//! - Input validation (account ids, amounts, sort keys)
//! - Balance lookups, top-ups and debits
//! - Transfers with a compensating reversal
//! - Display-currency conversion
//!
//! # Write Path
//!
//! Every mutation goes through [`LedgerStore::apply_delta`], which commits
//! the balance change and its transaction record together. The mutation runs
//! on its own task, so a request that is dropped mid-flight cannot abort a
//! commit that has already started. The operation deadline is enforced by
//! the store before its commit point.
//!
//! # Transfers
//!
//! A transfer never locks both accounts at once. The source is debited
//! first; if crediting the destination then fails, the debit is reversed
//! with a `transfer_reversal` credit. Only if that reversal also fails does
//! the caller see `TransferPartiallyFailed`. The legs run on one detached
//! task, so dropping the caller never strands a committed debit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::{
    error::AppError,
    models::{
        balance::Balance,
        money::{MINOR_UNIT_DIGITS, Money},
        transaction::{Operation, Transaction, TransactionOrder},
        transfer::TransferReceipt,
    },
    services::rates::RateSource,
    store::{AppliedDelta, LedgerStore},
};

/// Business operations over a [`LedgerStore`].
///
/// Holds no balances of its own. Cloning is cheap and shares the store.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    rates: Arc<dyn RateSource>,
    operation_timeout: Duration,
}

/// Parse a decimal amount string coming from a request.
///
/// # Errors
///
/// - `InvalidAmount`: not a decimal number
pub fn parse_amount(input: &str) -> Result<Money, AppError> {
    input
        .parse::<Money>()
        .map_err(|e| AppError::InvalidAmount(e.to_string()))
}

fn validate_account(account_id: i64) -> Result<(), AppError> {
    if account_id <= 0 {
        return Err(AppError::InvalidAccount);
    }
    Ok(())
}

fn validate_amount(amount: Money) -> Result<(), AppError> {
    if !amount.is_positive() {
        return Err(AppError::InvalidAmount(
            "Amount must be positive".to_string(),
        ));
    }
    if amount > Money::MAX {
        return Err(AppError::InvalidAmount(format!(
            "Amount must not exceed {}",
            Money::MAX
        )));
    }
    if amount.fractional_digits() > MINOR_UNIT_DIGITS {
        return Err(AppError::InvalidAmount(format!(
            "Amount must have at most {MINOR_UNIT_DIGITS} fractional digits"
        )));
    }
    Ok(())
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        rates: Arc<dyn RateSource>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            store,
            rates,
            operation_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Run a read under the operation deadline.
    async fn read<T>(&self, query: impl Future<Output = Result<T, AppError>>) -> Result<T, AppError> {
        tokio::time::timeout(self.operation_timeout, query)
            .await
            .map_err(|_| AppError::Timeout)?
    }

    /// Apply one atomic delta on a detached task.
    async fn apply(
        &self,
        account_id: i64,
        delta: Money,
        operation: Operation,
    ) -> Result<AppliedDelta, AppError> {
        let store = Arc::clone(&self.store);
        let deadline = Instant::now() + self.operation_timeout;

        tokio::spawn(async move { store.apply_delta(account_id, delta, operation, deadline).await })
            .await
            .map_err(|e| AppError::Internal(format!("ledger task failed: {e}")))?
    }

    /// Current balance of an account.
    ///
    /// # Errors
    ///
    /// - `InvalidAccount`: `account_id <= 0`
    /// - `AccountNotFound`: the account was never topped up
    /// - `Timeout`: the store did not answer in time
    pub async fn get_balance(&self, account_id: i64) -> Result<Balance, AppError> {
        validate_account(account_id)?;

        self.read(self.store.get_balance(account_id))
            .await?
            .ok_or(AppError::AccountNotFound)
    }

    /// Add money to an account, creating it on first use.
    ///
    /// # Errors
    ///
    /// - `InvalidAccount` / `InvalidAmount`: rejected before touching the store
    /// - `Timeout`: nothing was committed, safe to retry
    pub async fn top_up(&self, account_id: i64, amount: Money) -> Result<Balance, AppError> {
        validate_account(account_id)?;
        validate_amount(amount)?;

        let applied = self.apply(account_id, amount, Operation::TopUp).await?;
        tracing::info!(
            account_id,
            amount = %amount,
            balance = %applied.balance.amount,
            transaction_id = applied.transaction.id,
            "top-up applied"
        );

        Ok(applied.balance)
    }

    /// Remove money from an account.
    ///
    /// # Errors
    ///
    /// - `InvalidAccount` / `InvalidAmount`: rejected before touching the store
    /// - `AccountNotFound`: the account was never topped up
    /// - `InsufficientFunds`: balance would go negative; nothing changed
    /// - `Timeout`: nothing was committed, safe to retry
    pub async fn debit(&self, account_id: i64, amount: Money) -> Result<Balance, AppError> {
        validate_account(account_id)?;
        validate_amount(amount)?;

        let applied = self.apply(account_id, -amount, Operation::Debit).await?;
        tracing::info!(
            account_id,
            amount = %amount,
            balance = %applied.balance.amount,
            transaction_id = applied.transaction.id,
            "debit applied"
        );

        Ok(applied.balance)
    }

    /// Move money from one account to another.
    ///
    /// # Errors
    ///
    /// - `InvalidAccount` / `InvalidAmount` / `SameAccount`: rejected up front
    /// - `AccountNotFound` / `InsufficientFunds`: source leg refused, nothing changed
    /// - Any destination-leg error: the source debit has been reversed
    /// - `TransferPartiallyFailed`: the reversal failed too; needs an operator
    pub async fn transfer(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        amount: Money,
    ) -> Result<TransferReceipt, AppError> {
        validate_account(from_account_id)?;
        validate_account(to_account_id)?;
        validate_amount(amount)?;
        if from_account_id == to_account_id {
            return Err(AppError::SameAccount);
        }

        // Once the debit commits, the credit or its reversal must follow even
        // if the caller goes away, so the whole protocol runs detached.
        let ledger = self.clone();
        tokio::spawn(async move {
            ledger
                .run_transfer(from_account_id, to_account_id, amount)
                .await
        })
        .await
        .map_err(|e| AppError::Internal(format!("transfer task failed: {e}")))?
    }

    async fn run_transfer(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        amount: Money,
    ) -> Result<TransferReceipt, AppError> {
        // Advisory only. The debit below re-checks atomically.
        let source = self
            .read(self.store.get_balance(from_account_id))
            .await?
            .ok_or(AppError::AccountNotFound)?;
        if source.amount < amount {
            return Err(AppError::InsufficientFunds);
        }

        let debited = self
            .apply(from_account_id, -amount, Operation::TransferOut)
            .await?;

        let credited = match self.apply(to_account_id, amount, Operation::TransferIn).await {
            Ok(credited) => credited,
            Err(credit_err) => {
                return Err(self
                    .compensate(from_account_id, to_account_id, amount, credit_err)
                    .await);
            }
        };

        tracing::info!(
            from_account_id,
            to_account_id,
            amount = %amount,
            "transfer completed"
        );

        Ok(TransferReceipt {
            from_account_id,
            to_account_id,
            amount,
            from_balance: debited.balance.amount,
            to_balance: credited.balance.amount,
        })
    }

    /// Reverse a transfer's source debit after its credit leg failed.
    ///
    /// Returns the error the transfer must report.
    async fn compensate(
        &self,
        from_account_id: i64,
        to_account_id: i64,
        amount: Money,
        credit_err: AppError,
    ) -> AppError {
        tracing::warn!(
            from_account_id,
            to_account_id,
            amount = %amount,
            error = %credit_err,
            "transfer credit leg failed, reversing debit"
        );

        match self
            .apply(from_account_id, amount, Operation::TransferReversal)
            .await
        {
            Ok(_) => credit_err,
            Err(reversal_err) => {
                tracing::error!(
                    from_account_id,
                    to_account_id,
                    amount = %amount,
                    credit_error = %credit_err,
                    reversal_error = %reversal_err,
                    "transfer partially failed: source debited without matching credit or reversal"
                );
                AppError::TransferPartiallyFailed {
                    from_account_id,
                    to_account_id,
                    amount,
                    reason: format!("credit failed: {credit_err}; reversal failed: {reversal_err}"),
                }
            }
        }
    }

    /// History of an account.
    ///
    /// `sort_key` is `""` (insertion order), `"date"` (newest first) or
    /// `"amount"` (largest first).
    ///
    /// # Errors
    ///
    /// - `InvalidAccount`: `account_id <= 0`
    /// - `InvalidSortKey`: any other sort key
    pub async fn get_transactions(
        &self,
        account_id: i64,
        sort_key: &str,
    ) -> Result<Vec<Transaction>, AppError> {
        validate_account(account_id)?;
        let order = TransactionOrder::from_sort_key(sort_key)?;

        self.read(self.store.list_transactions(account_id, order))
            .await
    }

    /// Express a balance in another currency.
    ///
    /// Never touches the store. The result is rounded to two fractional digits.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: `target_currency` is not a 3-letter code
    /// - `RateUnavailable`: the rate source failed or did not answer in time
    pub async fn convert_balance(
        &self,
        balance: &Balance,
        target_currency: &str,
    ) -> Result<Balance, AppError> {
        let target = target_currency.trim().to_ascii_uppercase();
        if target.len() != 3 || !target.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AppError::InvalidRequest(format!(
                "Currency must be a 3-letter code, got {target_currency:?}"
            )));
        }
        if target == balance.currency {
            return Ok(balance.clone());
        }

        let rate = tokio::time::timeout(
            self.operation_timeout,
            self.rates.rate(&balance.currency, &target),
        )
        .await
        .map_err(|_| AppError::RateUnavailable("rate source timed out".to_string()))??;

        let amount = balance
            .amount
            .mul_rate(rate)
            .ok_or_else(|| AppError::RateUnavailable(format!("rate {rate} overflows balance")))?
            .round_to(MINOR_UNIT_DIGITS);

        Ok(Balance {
            amount,
            currency: target,
            ..balance.clone()
        })
    }
}
