//! Ledger store module
//!
//! The storage seam between the ledger services and a concrete backend.
//! `postgres` is the production backend; `memory` keeps the same locking
//! contract in-process for tests, demos and load runs.

mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::{Account, AccountId, Amount, Balance, NewAccount};

pub use error::StoreError;
pub use memory::{FaultPoint, MemoryLedgerStore};
pub use postgres::PgLedgerStore;

/// A relational ledger of accounts.
#[async_trait]
pub trait LedgerStore: Clone + Send + Sync + 'static {
    /// Unit-of-work handle returned by [`LedgerStore::begin`]
    type Tx: LedgerTx;

    /// Open a unit of work. Dropping the handle without committing rolls it back.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Insert a new account and return the committed row
    async fn insert_account(&self, account: &NewAccount) -> Result<Account, StoreError>;

    /// Read the latest committed version of an account
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Stream every account, ordered by id, as of the moment the stream starts
    fn stream_accounts(&self) -> BoxStream<'_, Result<Account, StoreError>>;
}

/// Operations available inside a unit of work.
#[async_trait]
pub trait LedgerTx: Send {
    /// Read an account and take its exclusive row lock until commit or rollback
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Check that an account exists
    async fn account_exists(&mut self, id: AccountId) -> Result<bool, StoreError>;

    /// Subtract `amount` if and only if the balance covers it.
    ///
    /// Returns the new balance, or `None` when the guard rejected the update
    /// or the account does not exist.
    async fn debit(&mut self, id: AccountId, amount: &Amount)
        -> Result<Option<Balance>, StoreError>;

    /// Add `amount` if and only if the result stays within `domain::MAX_AMOUNT`.
    ///
    /// Returns the new balance, or `None` when the guard rejected the update
    /// or the account does not exist.
    async fn credit(&mut self, id: AccountId, amount: &Amount)
        -> Result<Option<Balance>, StoreError>;

    /// Make every write of this unit of work durable
    async fn commit(self) -> Result<(), StoreError>;

    /// Discard every write of this unit of work
    async fn rollback(self) -> Result<(), StoreError>;
}
