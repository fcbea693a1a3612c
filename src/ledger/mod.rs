//! Ledger module
//!
//! Account repository, transaction manager and transfer engine, plus the
//! [`Ledger`] facade that forms the public boundary of the crate.

mod error;
mod repository;
mod retry;
mod transaction;
mod transfer;


use futures::stream::BoxStream;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::{Account, AccountId};
use crate::store::LedgerStore;

pub use error::{ErrorKind, LedgerError, Party};
pub use repository::AccountRepository;
pub use retry::RetryPolicy;
pub use transaction::TransactionManager;
pub use transfer::{TransferEngine, TransferReceipt};

/// Entry point for callers: account CRUD plus retried transfers.
#[derive(Debug, Clone)]
pub struct Ledger<S> {
    accounts: AccountRepository<S>,
    engine: TransferEngine<S>,
    retry: RetryPolicy,
    default_deadline: Option<Duration>,
}

impl<S: LedgerStore> Ledger<S> {
    /// Build a ledger over `store` with the default retry policy and no deadline
    pub fn new(store: S) -> Self {
        Self {
            accounts: AccountRepository::new(store.clone()),
            engine: TransferEngine::new(store),
            retry: RetryPolicy::default(),
            default_deadline: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Deadline applied to transfers that do not specify their own
    pub fn with_default_deadline(mut self, deadline: Duration) -> Self {
        self.engine = self.engine.with_default_deadline(deadline);
        self.default_deadline = Some(deadline);
        self
    }

    pub fn accounts(&self) -> &AccountRepository<S> {
        &self.accounts
    }

    pub fn engine(&self) -> &TransferEngine<S> {
        &self.engine
    }

    pub async fn create_account(
        &self,
        name: &str,
        email: &str,
        initial_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        self.accounts.create(name, email, initial_balance).await
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts.get_by_id(id).await
    }

    pub fn list_accounts(&self) -> BoxStream<'_, Result<Account, LedgerError>> {
        self.accounts.list()
    }

    /// Transfer with bounded retry on conflicts and timeouts.
    ///
    /// `deadline` (or the default one) bounds the whole call: each attempt
    /// gets only the time left, and backoff never sleeps past it.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        deadline: Option<Duration>,
    ) -> Result<TransferReceipt, LedgerError> {
        let Some(deadline) = deadline.or(self.default_deadline) else {
            return self
                .retry
                .run(move || self.engine.transfer(from, to, amount))
                .await;
        };

        let expires = Instant::now() + deadline;
        let attempts = self.retry.run(move || async move {
            let remaining = expires.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LedgerError::Timeout(deadline));
            }
            match self
                .engine
                .transfer_with_deadline(from, to, amount, remaining)
                .await
            {
                Err(LedgerError::Timeout(_)) => Err(LedgerError::Timeout(deadline)),
                other => other,
            }
        });

        match tokio::time::timeout_at(expires, attempts).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    from = %from,
                    to = %to,
                    deadline = ?deadline,
                    "transfer deadline elapsed between attempts"
                );
                Err(LedgerError::Timeout(deadline))
            }
        }
    }
}
