use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{
    error::AppError,
    models::{
        balance::Balance,
        money::Money,
        transaction::{Operation, Transaction, TransactionOrder},
    },
    store::{AppliedDelta, LedgerStore, next_balance, sort_transactions},
};

/// In-process ledger for tests, local runs and `STORAGE_BACKEND=memory`.
///
/// Each account lives behind its own async mutex, so mutations of one
/// account serialize while different accounts proceed in parallel. Readers
/// take the same lock and always see a balance together with its records.
pub struct InMemoryLedgerStore {
    currency: String,
    accounts: RwLock<HashMap<i64, Arc<Mutex<AccountSlot>>>>,
    next_transaction_id: AtomicI64,
}

#[derive(Default)]
struct AccountSlot {
    balance: Option<Balance>,
    transactions: Vec<Transaction>,
}

impl InMemoryLedgerStore {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            accounts: RwLock::new(HashMap::new()),
            next_transaction_id: AtomicI64::new(1),
        }
    }

    fn existing_slot(&self, account_id: i64) -> Result<Option<Arc<Mutex<AccountSlot>>>, AppError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| AppError::Internal("account directory lock poisoned".into()))?;
        Ok(accounts.get(&account_id).cloned())
    }

    fn slot(&self, account_id: i64) -> Result<Arc<Mutex<AccountSlot>>, AppError> {
        if let Some(slot) = self.existing_slot(account_id)? {
            return Ok(slot);
        }
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AppError::Internal("account directory lock poisoned".into()))?;
        Ok(accounts.entry(account_id).or_default().clone())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_balance(&self, account_id: i64) -> Result<Option<Balance>, AppError> {
        let Some(slot) = self.existing_slot(account_id)? else {
            return Ok(None);
        };
        let slot = slot.lock().await;
        Ok(slot.balance.clone())
    }

    #[tracing::instrument(skip(self, deadline), fields(backend = "memory"))]
    async fn apply_delta(
        &self,
        account_id: i64,
        delta: Money,
        operation: Operation,
        deadline: Instant,
    ) -> Result<AppliedDelta, AppError> {
        // Only a credit may create an account, so nothing else adds a slot
        let slot = if delta.is_positive() {
            self.slot(account_id)?
        } else {
            self.existing_slot(account_id)?
                .ok_or(AppError::AccountNotFound)?
        };
        let mut slot = tokio::time::timeout_at(deadline, slot.lock())
            .await
            .map_err(|_| AppError::Timeout)?;

        // Nothing below awaits, so the change is all-or-nothing.
        let now = Utc::now();
        let current = match &slot.balance {
            Some(balance) => balance.amount,
            None if delta.is_positive() => Money::ZERO,
            None => return Err(AppError::AccountNotFound),
        };
        let new_amount = next_balance(current, delta)?;

        let balance = match slot.balance.take() {
            Some(existing) => Balance {
                amount: new_amount,
                updated_at: now,
                ..existing
            },
            None => Balance {
                account_id,
                amount: new_amount,
                currency: self.currency.clone(),
                created_at: now,
                updated_at: now,
            },
        };
        let transaction = Transaction {
            id: self.next_transaction_id.fetch_add(1, Ordering::SeqCst),
            account_id,
            amount: delta,
            operation,
            created_at: now,
        };

        slot.balance = Some(balance.clone());
        slot.transactions.push(transaction.clone());

        Ok(AppliedDelta {
            balance,
            transaction,
        })
    }

    async fn list_transactions(
        &self,
        account_id: i64,
        order: TransactionOrder,
    ) -> Result<Vec<Transaction>, AppError> {
        let Some(slot) = self.existing_slot(account_id)? else {
            return Ok(Vec::new());
        };
        let mut transactions = slot.lock().await.transactions.clone();
        sort_transactions(&mut transactions, order);
        Ok(transactions)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
