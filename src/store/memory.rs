//! In-memory ledger store
//!
//! Mirrors the Postgres locking contract without a database:
//! - every account row owns an async mutex, held by a transaction from the
//!   first read-for-update or write until commit/rollback;
//! - writes are buffered per transaction and applied atomically at commit,
//!   so a dropped transaction leaves no trace;
//! - a row lock requested while the transaction already holds another lock
//!   waits at most `deadlock_timeout`, then fails with a conflict.
//!
//! Faults can be injected at fixed points to exercise rollback paths.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::domain::{Account, AccountId, Amount, Balance, NewAccount};

use super::{LedgerStore, LedgerTx, StoreError};

/// Same default as Postgres `deadlock_timeout`
const DEFAULT_DEADLOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Where an injected fault fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Begin,
    Lock,
    Debit,
    Credit,
    Commit,
}

struct Row {
    account: Account,
    lock: Arc<Mutex<()>>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<AccountId, Row>,
    emails: HashSet<String>,
}

struct Inner {
    state: RwLock<State>,
    faults: StdMutex<HashMap<FaultPoint, StoreError>>,
    deadlock_timeout: Duration,
}

impl Inner {
    fn take_fault(&self, point: FaultPoint) -> Result<(), StoreError> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        match faults.remove(&point) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-process ledger store
#[derive(Clone)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_deadlock_timeout(DEFAULT_DEADLOCK_TIMEOUT)
    }

    /// Create an empty store with a custom deadlock detection window
    pub fn with_deadlock_timeout(deadlock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                faults: StdMutex::new(HashMap::new()),
                deadlock_timeout,
            }),
        }
    }

    /// Make the next operation reaching `point` fail with `error`.
    /// Each injected fault fires once.
    pub fn inject_fault(&self, point: FaultPoint, error: StoreError) {
        self.inner
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(point, error);
    }

    /// Sum of all committed balances
    pub async fn total_balance(&self) -> Decimal {
        let state = self.inner.state.read().await;
        state
            .rows
            .values()
            .map(|row| row.account.balance.value())
            .sum()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        self.inner.take_fault(FaultPoint::Begin)?;
        Ok(MemoryLedgerTx {
            inner: Arc::clone(&self.inner),
            locks: HashMap::new(),
            deltas: BTreeMap::new(),
        })
    }

    async fn insert_account(&self, account: &NewAccount) -> Result<Account, StoreError> {
        let mut state = self.inner.state.write().await;

        if state.emails.contains(account.email()) {
            return Err(StoreError::UniqueViolation(format!(
                "duplicate key value violates unique constraint \"accounts_email_key\": {}",
                account.email()
            )));
        }

        state.next_id += 1;
        let created = Account {
            id: AccountId::new(state.next_id),
            name: account.name().to_string(),
            email: account.email().to_string(),
            balance: account.initial_balance(),
            created_at: Utc::now(),
        };

        state.emails.insert(created.email.clone());
        state.rows.insert(
            created.id,
            Row {
                account: created.clone(),
                lock: Arc::new(Mutex::new(())),
            },
        );

        Ok(created)
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let state = self.inner.state.read().await;
        Ok(state.rows.get(&id).map(|row| row.account.clone()))
    }

    fn stream_accounts(&self) -> BoxStream<'_, Result<Account, StoreError>> {
        let inner = Arc::clone(&self.inner);
        stream::once(async move {
            let state = inner.state.read().await;
            let snapshot: Vec<Result<Account, StoreError>> = state
                .rows
                .values()
                .map(|row| Ok(row.account.clone()))
                .collect();
            stream::iter(snapshot)
        })
        .flatten()
        .boxed()
    }
}

/// A unit of work against [`MemoryLedgerStore`]
pub struct MemoryLedgerTx {
    inner: Arc<Inner>,
    locks: HashMap<AccountId, OwnedMutexGuard<()>>,
    deltas: BTreeMap<AccountId, Decimal>,
}

impl MemoryLedgerTx {
    /// Take the row lock for `id`. Returns `false` if the row does not exist.
    async fn acquire(&mut self, id: AccountId) -> Result<bool, StoreError> {
        if self.locks.contains_key(&id) {
            return Ok(true);
        }

        let lock = {
            let state = self.inner.state.read().await;
            match state.rows.get(&id) {
                Some(row) => Arc::clone(&row.lock),
                None => return Ok(false),
            }
        };

        let guard = if self.locks.is_empty() {
            // Holding nothing, so this wait cannot be part of a cycle
            lock.lock_owned().await
        } else {
            tokio::time::timeout(self.inner.deadlock_timeout, lock.lock_owned())
                .await
                .map_err(|_| {
                    StoreError::Conflict(format!(
                        "deadlock detected while waiting for account {id}"
                    ))
                })?
        };

        self.locks.insert(id, guard);
        Ok(true)
    }

    /// Committed balance plus this transaction's pending writes
    async fn current(&self, id: AccountId) -> Option<Account> {
        let state = self.inner.state.read().await;
        let mut account = state.rows.get(&id)?.account.clone();
        let delta = self.deltas.get(&id).copied().unwrap_or_default();
        account.balance = Balance::from_stored(account.balance.value() + delta);
        Some(account)
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.inner.take_fault(FaultPoint::Lock)?;
        if !self.acquire(id).await? {
            return Ok(None);
        }
        Ok(self.current(id).await)
    }

    async fn account_exists(&mut self, id: AccountId) -> Result<bool, StoreError> {
        let state = self.inner.state.read().await;
        Ok(state.rows.contains_key(&id))
    }

    async fn debit(
        &mut self,
        id: AccountId,
        amount: &Amount,
    ) -> Result<Option<Balance>, StoreError> {
        self.inner.take_fault(FaultPoint::Debit)?;
        if !self.acquire(id).await? {
            return Ok(None);
        }
        let Some(account) = self.current(id).await else {
            return Ok(None);
        };
        let Ok(balance) = account.balance.debit(amount) else {
            return Ok(None);
        };

        *self.deltas.entry(id).or_default() -= amount.value();
        Ok(Some(balance))
    }

    async fn credit(
        &mut self,
        id: AccountId,
        amount: &Amount,
    ) -> Result<Option<Balance>, StoreError> {
        self.inner.take_fault(FaultPoint::Credit)?;
        if !self.acquire(id).await? {
            return Ok(None);
        }
        let Some(account) = self.current(id).await else {
            return Ok(None);
        };
        let Ok(balance) = account.balance.credit(amount) else {
            return Ok(None);
        };

        *self.deltas.entry(id).or_default() += amount.value();
        Ok(Some(balance))
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.inner.take_fault(FaultPoint::Commit)?;

        let mut state = self.inner.state.write().await;

        // Validate everything first so a failed commit applies nothing
        for (id, delta) in &self.deltas {
            let row = state
                .rows
                .get(id)
                .ok_or_else(|| StoreError::Conflict(format!("account {id} vanished")))?;
            if let Err(e) = Balance::new(row.account.balance.value() + delta) {
                return Err(StoreError::CheckViolation(format!(
                    "balance of account {id} out of range: {e}"
                )));
            }
        }

        for (id, delta) in &self.deltas {
            if let Some(row) = state.rows.get_mut(id) {
                let balance = row.account.balance.value() + delta;
                row.account.balance = Balance::from_stored(balance);
            }
        }

        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
