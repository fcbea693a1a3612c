//! Ledger errors
//!
//! One taxonomy for everything the ledger boundary can report.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::domain::{AccountId, DomainError};
use crate::store::StoreError;

/// Which side of a transfer an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Sender,
    Receiver,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Sender => f.write_str("sender"),
            Party::Receiver => f.write_str("receiver"),
        }
    }
}

/// Coarse error classification exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    DuplicateEmail,
    NotFound,
    AccountNotFound,
    InsufficientFunds,
    Conflict,
    Timeout,
    Storage,
}

/// Errors returned by the account repository and the transfer engine
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed input; nothing was written
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// Another account already uses this email
    #[error("An account with email {0:?} already exists")]
    DuplicateEmail(String),

    /// Lookup by id found nothing
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// A transfer party does not exist; nothing was written
    #[error("The {who} account {id} does not exist")]
    AccountNotFound { who: Party, id: AccountId },

    /// Sender balance does not cover the amount; nothing was written
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: Decimal, need: Decimal },

    /// Serialization failure or deadlock; safe to retry from scratch
    #[error("Transaction conflict, retry the transfer")]
    Conflict(String),

    /// Deadline elapsed; the unit of work was rolled back
    #[error("Transfer did not complete within {0:?}")]
    Timeout(Duration),

    /// Store fault. The message stays generic; details live in the source.
    #[error("Storage failure")]
    Storage(#[source] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::DuplicateEmail(_) => ErrorKind::DuplicateEmail,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Conflicts and timeouts leave the ledger untouched and may succeed on retry.
    /// Financial-rule violations never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Timeout(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(detail) => LedgerError::Conflict(detail),
            other => LedgerError::Storage(other),
        }
    }
}
