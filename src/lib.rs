//! atomic_ledger Library
//!
//! Account ledger with atomic, all-or-nothing balance transfers.
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod ledger;
pub mod store;

pub use config::Config;
pub use domain::{Account, AccountId, Amount, AmountError, Balance, DomainError, NewAccount};
pub use error::{AppError, AppResult, ErrorResponse};
pub use ledger::{ErrorKind, Ledger, LedgerError, Party, RetryPolicy, TransferReceipt};
pub use store::{LedgerStore, LedgerTx, MemoryLedgerStore, PgLedgerStore, StoreError};
