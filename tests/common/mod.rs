//! Common test utilities

#![allow(dead_code)]

use axum::Router;
use rust_decimal::Decimal;
use sqlx::PgPool;

use atomic_ledger::api::{self, ApiKeyDigest};
use atomic_ledger::config::PoolConfig;
use atomic_ledger::{db, AccountId, Ledger, MemoryLedgerStore, PgLedgerStore, RetryPolicy};

pub const TEST_API_KEY: &str = "test_key_123";

/// Ledger over a fresh in-memory store, retries disabled
pub fn memory_ledger() -> (MemoryLedgerStore, Ledger<MemoryLedgerStore>) {
    let store = MemoryLedgerStore::new();
    let ledger = Ledger::new(store.clone()).with_retry_policy(RetryPolicy::none());
    (store, ledger)
}

/// Full HTTP app over a fresh in-memory store
pub fn memory_app() -> (MemoryLedgerStore, Router) {
    let (store, ledger) = memory_ledger();
    let app = api::build_router(ledger, ApiKeyDigest::from_plaintext(TEST_API_KEY));
    (store, app)
}

/// Setup test database - create the schema and truncate accounts
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool_config = PoolConfig {
        max_connections: 20,
        min_connections: 1,
        idle_timeout: std::time::Duration::from_secs(30),
        max_lifetime: std::time::Duration::from_secs(300),
        acquire_timeout: std::time::Duration::from_secs(10),
    };
    let pool = db::connect(&database_url, &pool_config)
        .await
        .expect("Failed to connect to DB");

    db::ensure_schema(&pool).await.expect("Failed to create schema");

    // Clean up DB for fresh state
    sqlx::query("TRUNCATE TABLE accounts RESTART IDENTITY")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}

/// Ledger over the test database, retries disabled
pub async fn postgres_ledger() -> (PgPool, Ledger<PgLedgerStore>) {
    let pool = setup_test_db().await;
    let ledger = Ledger::new(PgLedgerStore::new(pool.clone())).with_retry_policy(RetryPolicy::none());
    (pool, ledger)
}

/// Sum of every balance in the accounts table
pub async fn total_balance(pool: &PgPool) -> Decimal {
    sqlx::query_scalar("SELECT COALESCE(SUM(balance), 0) FROM accounts")
        .fetch_one(pool)
        .await
        .expect("Failed to sum balances")
}

/// Balance of one account read straight from the table
pub async fn balance_of(pool: &PgPool, id: AccountId) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
        .bind(id.get())
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}
