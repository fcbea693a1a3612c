//! Domain module
//!
//! Core domain types and validation rules.

pub mod account;
pub mod amount;
pub mod error;

pub use account::{Account, AccountId, NewAccount};
pub use amount::{max_amount, Amount, AmountError, Balance, MAX_AMOUNT};
pub use error::DomainError;
