//! Transfer Engine
//!
//! Moves funds between two accounts inside one unit of work:
//! validate → lock sender → check funds and receiver → debit/guarded credit → commit.
//! Any failure before commit rolls the whole transfer back.

use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{AccountId, Amount, DomainError};
use crate::store::{LedgerStore, LedgerTx};

use super::{LedgerError, Party, TransactionManager};

/// Outcome of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    /// Correlation id for logs; not persisted
    pub transfer_id: Uuid,
    pub from_id: AccountId,
    pub to_id: AccountId,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
}

/// Orchestrates balance transfers. The only component that writes balances.
#[derive(Debug, Clone)]
pub struct TransferEngine<S> {
    transactions: TransactionManager<S>,
    default_deadline: Option<Duration>,
}

impl<S: LedgerStore> TransferEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            transactions: TransactionManager::new(store),
            default_deadline: None,
        }
    }

    /// Apply `deadline` to every [`TransferEngine::transfer`] call
    pub fn with_default_deadline(mut self, deadline: Duration) -> Self {
        self.default_deadline = Some(deadline);
        self
    }

    /// Transfer `amount` from `from` to `to`, bounded by the default deadline if one is set.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        match self.default_deadline {
            Some(deadline) => self.transfer_with_deadline(from, to, amount, deadline).await,
            None => self.execute(from, to, amount).await,
        }
    }

    /// Transfer with an explicit deadline. On expiry the in-flight unit of
    /// work is dropped (rolled back) and `LedgerError::Timeout` is returned.
    pub async fn transfer_with_deadline(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        deadline: Duration,
    ) -> Result<TransferReceipt, LedgerError> {
        match tokio::time::timeout(deadline, self.execute(from, to, amount)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    from = %from,
                    to = %to,
                    deadline = ?deadline,
                    "transfer deadline elapsed, rolled back"
                );
                Err(LedgerError::Timeout(deadline))
            }
        }
    }

    async fn execute(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        let amount = validate(from, to, amount)?;
        let transfer_id = Uuid::new_v4();

        let result = self
            .transactions
            .with_transaction(move |tx| {
                Box::pin(apply_transfer(tx, transfer_id, from, to, amount))
            })
            .await;

        match &result {
            Ok(_) => {
                tracing::info!(%transfer_id, from = %from, to = %to, "transfer committed");
            }
            Err(LedgerError::Storage(source)) => {
                tracing::error!(
                    %transfer_id,
                    operation = "transfer",
                    from = %from,
                    to = %to,
                    error = ?source,
                    "transfer failed at the store"
                );
            }
            Err(e) => {
                tracing::debug!(%transfer_id, from = %from, to = %to, kind = ?e.kind(), "transfer rejected");
            }
        }

        result
    }
}

/// Reject bad input before any unit of work is opened
fn validate(from: AccountId, to: AccountId, amount: Decimal) -> Result<Amount, LedgerError> {
    let amount = Amount::new(amount).map_err(DomainError::invalid_amount)?;
    if from == to {
        return Err(DomainError::SameAccountTransfer(from).into());
    }
    Ok(amount)
}

async fn apply_transfer<T: LedgerTx>(
    tx: &mut T,
    transfer_id: Uuid,
    from: AccountId,
    to: AccountId,
    amount: Amount,
) -> Result<TransferReceipt, LedgerError> {
    // Sender row first, always. A cycle with an opposing transfer is caught by
    // the store and surfaces as Conflict.
    let sender = tx
        .lock_account(from)
        .await?
        .ok_or(LedgerError::AccountNotFound {
            who: Party::Sender,
            id: from,
        })?;

    if !sender.balance.is_sufficient_for(&amount) {
        return Err(LedgerError::InsufficientFunds {
            have: sender.balance.value(),
            need: amount.value(),
        });
    }

    if !tx.account_exists(to).await? {
        return Err(LedgerError::AccountNotFound {
            who: Party::Receiver,
            id: to,
        });
    }

    let from_balance = tx.debit(from, &amount).await?.ok_or_else(|| {
        // The row lock should make this unreachable
        tracing::warn!(%transfer_id, account_id = %from, "debit guard rejected a locked row");
        LedgerError::Conflict(format!("balance of account {from} changed under lock"))
    })?;

    let to_balance = match tx.credit(to, &amount).await? {
        Some(balance) => balance,
        // The receiver was seen above, so a rejected credit means no headroom
        None if tx.account_exists(to).await? => {
            return Err(DomainError::BalanceLimitExceeded(to).into());
        }
        None => {
            return Err(LedgerError::AccountNotFound {
                who: Party::Receiver,
                id: to,
            })
        }
    };

    Ok(TransferReceipt {
        transfer_id,
        from_id: from,
        to_id: to,
        amount: amount.value(),
        from_balance: from_balance.value(),
        to_balance: to_balance.value(),
    })
}
