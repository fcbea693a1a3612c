//! PostgreSQL ledger store
//!
//! Row locks come from `SELECT ... FOR UPDATE` under the default READ
//! COMMITTED isolation. Deadlocks and serialization failures are detected by
//! Postgres and surface as [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::{max_amount, Account, AccountId, Amount, Balance, NewAccount};

use super::{LedgerStore, LedgerTx, StoreError};

type AccountRow = (i64, String, String, Decimal, DateTime<Utc>);

fn into_account((id, name, email, balance, created_at): AccountRow) -> Account {
    Account {
        id: AccountId::new(id),
        name,
        email,
        balance: Balance::from_stored(balance),
        created_at,
    }
}

/// Postgres-backed ledger store
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new store over a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTx { tx })
    }

    async fn insert_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let row: AccountRow = sqlx::query_as(
            r#"
            INSERT INTO accounts (name, email, balance)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, balance, created_at
            "#,
        )
        .bind(account.name())
        .bind(account.email())
        .bind(account.initial_balance().value())
        .fetch_one(&self.pool)
        .await?;

        Ok(into_account(row))
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, balance, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_account))
    }

    fn stream_accounts(&self) -> BoxStream<'_, Result<Account, StoreError>> {
        sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, name, email, balance, created_at
            FROM accounts
            ORDER BY id ASC
            "#,
        )
        .fetch(&self.pool)
        .map_ok(into_account)
        .map_err(StoreError::from)
        .boxed()
    }
}

/// A Postgres transaction. Dropping it without commit rolls back.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, balance, created_at
            FROM accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(into_account))
    }

    async fn account_exists(&mut self, id: AccountId) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE id = $1)")
                .bind(id.get())
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(exists)
    }

    async fn debit(
        &mut self,
        id: AccountId,
        amount: &Amount,
    ) -> Result<Option<Balance>, StoreError> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance = balance - $2, updated_at = NOW()
            WHERE id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(id.get())
        .bind(amount.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(balance.map(Balance::from_stored))
    }

    async fn credit(
        &mut self,
        id: AccountId,
        amount: &Amount,
    ) -> Result<Option<Balance>, StoreError> {
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1 AND balance + $2 <= $3
            RETURNING balance
            "#,
        )
        .bind(id.get())
        .bind(amount.value())
        .bind(max_amount())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(balance.map(Balance::from_stored))
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
