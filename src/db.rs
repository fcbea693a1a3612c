//! Database module
//!
//! Connection pool construction and schema bootstrap for the accounts table.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::PoolConfig;

/// Accounts table. Balance is exact NUMERIC, never below zero and never
/// above one trillion (`domain::MAX_AMOUNT`).
const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL CHECK (length(btrim(name)) > 0),
    email       TEXT NOT NULL UNIQUE,
    balance     NUMERIC(21, 8) NOT NULL DEFAULT 0
                CHECK (balance >= 0 AND balance <= 1000000000000),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Build a bounded connection pool
pub async fn connect(database_url: &str, pool: &PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .idle_timeout(pool.idle_timeout)
        .max_lifetime(pool.max_lifetime)
        .acquire_timeout(pool.acquire_timeout)
        .connect(database_url)
        .await
}

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Create the accounts table if it does not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_ACCOUNTS_TABLE).execute(pool).await?;
    tracing::info!("accounts table ready");
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = 'accounts'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !exists {
        tracing::error!("Required table 'accounts' does not exist");
    }

    Ok(exists)
}
