// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use balance_ledger::{
    error::AppError,
    models::{
        balance::Balance,
        money::Money,
        transaction::{Operation, Transaction, TransactionOrder},
    },
    services::{ledger_service::LedgerService, rates::FixedRates},
    store::{AppliedDelta, InMemoryLedgerStore, LedgerStore},
};
use rust_decimal_macros::dec;
use tokio::time::Instant;

pub const CURRENCY: &str = "RUB";

/// Parse a decimal literal into Money
pub fn money(s: &str) -> Money {
    s.parse().expect("valid money literal")
}

/// Rates used by every test service: 1 RUB = 0.0125 USD, 1 EUR = 100 RUB
pub fn test_rates() -> FixedRates {
    FixedRates::new()
        .with_rate("RUB", "USD", dec!(0.0125))
        .with_rate("EUR", "RUB", dec!(100))
}

/// Service over a fresh in-memory store
pub fn memory_service() -> LedgerService {
    service_over(Arc::new(InMemoryLedgerStore::new(CURRENCY)))
}

pub fn service_over(store: Arc<dyn LedgerStore>) -> LedgerService {
    LedgerService::new(store, Arc::new(test_rates()), Duration::from_secs(2))
}

/// Sum of every transaction amount recorded for an account
pub async fn history_total(service: &LedgerService, account_id: i64) -> Money {
    service
        .get_transactions(account_id, "")
        .await
        .expect("history readable")
        .iter()
        .map(|t| t.amount)
        .sum()
}

/// Store wrapper that fails or slows chosen `(account, operation)` deltas.
///
/// Failing calls never reach the inner store, like a write that timed out
/// before its commit point. Slowed calls sleep inside the store call and
/// then apply normally.
pub struct FaultyStore {
    inner: InMemoryLedgerStore,
    failing: Mutex<HashSet<(i64, Operation)>>,
    delays: Mutex<HashMap<(i64, Operation), Duration>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryLedgerStore::new(CURRENCY),
            failing: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay_on(&self, account_id: i64, operation: Operation, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert((account_id, operation), delay);
    }

    fn delay_for(&self, account_id: i64, operation: Operation) -> Option<Duration> {
        self.delays
            .lock()
            .unwrap()
            .get(&(account_id, operation))
            .copied()
    }

    pub fn fail_on(&self, account_id: i64, operation: Operation) {
        self.failing
            .lock()
            .unwrap()
            .insert((account_id, operation));
    }

    fn should_fail(&self, account_id: i64, operation: Operation) -> bool {
        self.failing
            .lock()
            .unwrap()
            .contains(&(account_id, operation))
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn get_balance(&self, account_id: i64) -> Result<Option<Balance>, AppError> {
        self.inner.get_balance(account_id).await
    }

    async fn apply_delta(
        &self,
        account_id: i64,
        delta: Money,
        operation: Operation,
        deadline: Instant,
    ) -> Result<AppliedDelta, AppError> {
        if self.should_fail(account_id, operation) {
            return Err(AppError::Timeout);
        }
        if let Some(delay) = self.delay_for(account_id, operation) {
            tokio::time::sleep(delay).await;
        }
        self.inner
            .apply_delta(account_id, delta, operation, deadline)
            .await
    }

    async fn list_transactions(
        &self,
        account_id: i64,
        order: TransactionOrder,
    ) -> Result<Vec<Transaction>, AppError> {
        self.inner.list_transactions(account_id, order).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "faulty"
    }
}
