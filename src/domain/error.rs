//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::{AccountId, MAX_AMOUNT};

/// Input validation failures.
///
/// Every variant except `BalanceLimitExceeded` is raised before a unit of
/// work is opened. That one is detected by the credit guard and rolls the
/// unit of work back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Account name is empty or whitespace
    #[error("Account name must not be empty")]
    EmptyName,

    /// Account name exceeds the column limit
    #[error("Account name exceeds {0} characters")]
    NameTooLong(usize),

    /// Email is not a syntactically valid address
    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),

    /// Initial balance is negative, too precise or too large
    #[error("Invalid initial balance: {0}")]
    InvalidBalance(String),

    /// Invalid transfer amount (zero, negative, or exceeds limit)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transfer to same account
    #[error("Cannot transfer from account {0} to itself")]
    SameAccountTransfer(AccountId),

    /// Crediting the account would take its balance past the maximum
    #[error("Balance of account {0} would exceed the maximum ({MAX_AMOUNT})")]
    BalanceLimitExceeded(AccountId),
}

impl DomainError {
    /// Create an invalid amount error
    pub fn invalid_amount(reason: impl ToString) -> Self {
        Self::InvalidAmount(reason.to_string())
    }

    /// Machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyName | Self::NameTooLong(_) => "invalid_name",
            Self::InvalidEmail(_) => "invalid_email",
            Self::InvalidBalance(_) => "invalid_balance",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::SameAccountTransfer(_) => "same_account_transfer",
            Self::BalanceLimitExceeded(_) => "balance_limit_exceeded",
        }
    }
}
