//! PostgreSQL ledger store.
//!
//! # Atomicity Guarantees
//!
//! Every balance change runs inside one PostgreSQL transaction:
//!
//! 1. Lock the balance row (`FOR UPDATE`), creating it on a first top-up
//! 2. Compute the new balance and reject it if negative
//! 3. Update the balance
//! 4. Append the transaction record
//! 5. Commit
//!
//! Steps 1-4 run under the caller's deadline. If it fires, the open
//! transaction is dropped and PostgreSQL rolls it back. The commit itself is
//! never cut short by the deadline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Postgres;
use tokio::time::Instant;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        balance::Balance,
        money::Money,
        transaction::{Operation, Transaction, TransactionOrder},
    },
    store::{AppliedDelta, LedgerStore, next_balance},
};

/// Ledger store backed by the `balances` and `transactions` tables.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: DbPool,
    currency: String,
}

/// Raw `transactions` row. The operation tag is stored as text.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    account_id: i64,
    amount: Money,
    operation: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            account_id: row.account_id,
            amount: row.amount,
            operation: row.operation.parse()?,
            created_at: row.created_at,
        })
    }
}

impl PgLedgerStore {
    pub fn new(pool: DbPool, currency: impl Into<String>) -> Self {
        Self {
            pool,
            currency: currency.into(),
        }
    }

    /// Run every step up to (not including) the commit.
    ///
    /// Returning early drops `tx`, which rolls the transaction back.
    async fn prepare_delta(
        &self,
        account_id: i64,
        delta: Money,
        operation: Operation,
    ) -> Result<(sqlx::Transaction<'static, Postgres>, AppliedDelta), AppError> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE serializes every writer of this account
        let current: Option<Money> =
            sqlx::query_scalar("SELECT amount FROM balances WHERE account_id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;

        let current = match current {
            Some(amount) => amount,
            None if delta.is_positive() => {
                // First top-up. A concurrent first top-up may insert the row
                // first; ON CONFLICT then waits for it and we lock its row.
                sqlx::query(
                    r#"
                    INSERT INTO balances (account_id, amount, currency)
                    VALUES ($1, 0, $2)
                    ON CONFLICT (account_id) DO NOTHING
                    "#,
                )
                .bind(account_id)
                .bind(&self.currency)
                .execute(&mut *tx)
                .await?;

                sqlx::query_scalar("SELECT amount FROM balances WHERE account_id = $1 FOR UPDATE")
                    .bind(account_id)
                    .fetch_one(&mut *tx)
                    .await?
            }
            None => return Err(AppError::AccountNotFound),
        };

        let new_amount = next_balance(current, delta)?;

        let balance = sqlx::query_as::<_, Balance>(
            r#"
            UPDATE balances
            SET amount = $1,
                updated_at = NOW()
            WHERE account_id = $2
            RETURNING account_id, amount, currency, created_at, updated_at
            "#,
        )
        .bind(new_amount)
        .bind(account_id)
        .fetch_one(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (account_id, amount, operation)
            VALUES ($1, $2, $3)
            RETURNING id, account_id, amount, operation, created_at
            "#,
        )
        .bind(account_id)
        .bind(delta)
        .bind(operation.as_str())
        .fetch_one(&mut *tx)
        .await?;

        Ok((
            tx,
            AppliedDelta {
                balance,
                transaction: row.try_into()?,
            },
        ))
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_balance(&self, account_id: i64) -> Result<Option<Balance>, AppError> {
        let balance = sqlx::query_as::<_, Balance>(
            r#"
            SELECT account_id, amount, currency, created_at, updated_at
            FROM balances
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    #[tracing::instrument(skip(self, deadline), fields(backend = "postgres"))]
    async fn apply_delta(
        &self,
        account_id: i64,
        delta: Money,
        operation: Operation,
        deadline: Instant,
    ) -> Result<AppliedDelta, AppError> {
        let (tx, applied) =
            tokio::time::timeout_at(deadline, self.prepare_delta(account_id, delta, operation))
                .await
                .map_err(|_| AppError::Timeout)??;

        // Commit point
        tx.commit().await?;

        Ok(applied)
    }

    async fn list_transactions(
        &self,
        account_id: i64,
        order: TransactionOrder,
    ) -> Result<Vec<Transaction>, AppError> {
        // Backed by the (account_id, created_at DESC) and (account_id, amount DESC) indexes
        let order_by = match order {
            TransactionOrder::Insertion => "id ASC",
            TransactionOrder::DateDescending => "created_at DESC, id DESC",
            TransactionOrder::AmountDescending => "amount DESC, id ASC",
        };
        let query = format!(
            "SELECT id, account_id, amount, operation, created_at \
             FROM transactions WHERE account_id = $1 ORDER BY {order_by}"
        );

        let rows = sqlx::query_as::<_, TransactionRow>(&query)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
