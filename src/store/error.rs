//! Store Errors
//!
//! Error types for ledger store operations, classified so that callers can
//! tell transient conflicts from hard failures.

/// Postgres SQLSTATE for serialization_failure
const SERIALIZATION_FAILURE: &str = "40001";
/// Postgres SQLSTATE for deadlock_detected
const DEADLOCK_DETECTED: &str = "40P01";
/// Postgres SQLSTATE for lock_not_available (lock_timeout)
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for check_violation
const CHECK_VIOLATION: &str = "23514";
/// Postgres SQLSTATE for numeric_value_out_of_range
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Errors that can occur in a ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization failure or deadlock; the unit of work was aborted
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A check constraint or the column's numeric range rejected the write
    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    /// No connection could be obtained
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Check if this error is a transient conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                match db.code().as_deref() {
                    Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE) => {
                        Some(StoreError::Conflict(message))
                    }
                    Some(UNIQUE_VIOLATION) => Some(StoreError::UniqueViolation(message)),
                    Some(CHECK_VIOLATION | NUMERIC_OUT_OF_RANGE) => {
                        Some(StoreError::CheckViolation(message))
                    }
                    _ => None,
                }
            }
            sqlx::Error::PoolTimedOut => Some(StoreError::Unavailable(
                "timed out waiting for a pooled connection".to_string(),
            )),
            sqlx::Error::PoolClosed => Some(StoreError::Unavailable(
                "connection pool is closed".to_string(),
            )),
            _ => None,
        };

        classified.unwrap_or(StoreError::Database(err))
    }
}
