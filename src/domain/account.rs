//! Account records
//!
//! The ledger row type plus the validated input used to create one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::ValidateEmail;

use super::{Balance, DomainError};

/// Maximum length of an account display name
const MAX_NAME_LEN: usize = 255;

/// Store-assigned account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A ledger account as committed in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
}

/// Validated input for account creation.
///
/// Fields are private so a `NewAccount` can only come out of [`NewAccount::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    name: String,
    email: String,
    initial_balance: Balance,
}

impl NewAccount {
    /// Validate and normalize account input.
    ///
    /// Name and email are trimmed, email is lower-cased.
    pub fn new(
        name: impl AsRef<str>,
        email: impl AsRef<str>,
        initial_balance: Decimal,
    ) -> Result<Self, DomainError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(DomainError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::NameTooLong(MAX_NAME_LEN));
        }

        let email = email.as_ref().trim().to_lowercase();
        if !email.validate_email() {
            return Err(DomainError::InvalidEmail(email));
        }

        let initial_balance =
            Balance::new(initial_balance).map_err(|e| DomainError::InvalidBalance(e.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            email,
            initial_balance,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn initial_balance(&self) -> Balance {
        self.initial_balance
    }
}
