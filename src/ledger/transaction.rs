//! Transaction Manager
//!
//! Scoped unit-of-work: `with_transaction` commits only when the work
//! succeeds and rolls back on every other exit path. Timeouts, panics and
//! cancelled futures drop the store handle, which rolls back as well.

use futures::future::BoxFuture;

use crate::store::{LedgerStore, LedgerTx, StoreError};

/// Opens and settles units of work against a store
#[derive(Debug, Clone)]
pub struct TransactionManager<S> {
    store: S,
}

impl<S: LedgerStore> TransactionManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run `work` inside one unit of work.
    ///
    /// - `Ok` from `work`: commit. A failed commit is returned as `E::from(StoreError)`.
    /// - `Err` from `work`: rollback, then return the original error. A
    ///   rollback failure is logged and otherwise ignored; the store discards
    ///   uncommitted work on its own.
    pub async fn with_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        T: Send,
        E: From<StoreError> + Send,
        F: for<'t> FnOnce(&'t mut S::Tx) -> BoxFuture<'t, Result<T, E>> + Send,
    {
        let mut tx = self.store.begin().await?;

        match work(&mut tx).await {
            Ok(value) => {
                if let Err(commit_err) = tx.commit().await {
                    if commit_err.is_conflict() {
                        tracing::debug!(error = %commit_err, "commit aborted by a concurrent unit of work");
                    } else {
                        tracing::error!(error = ?commit_err, "commit failed");
                    }
                    return Err(commit_err.into());
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = ?rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
