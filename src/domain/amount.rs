//! Amount and Balance types
//!
//! Domain primitives for monetary values. Both are exact decimals; binary
//! floating point never touches a balance.
//! All values are validated at construction time, ensuring invalid values
//! cannot exist in the system.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum allowed amount or balance (1 trillion)
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Maximum decimal places (8), matching the NUMERIC(21, 8) column
pub const MAX_SCALE: u32 = 8;

/// [`MAX_AMOUNT`] as a decimal, for binding into balance guards
pub fn max_amount() -> Decimal {
    Decimal::from(MAX_AMOUNT)
}

/// Amount represents a validated, strictly positive monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Maximum 8 decimal places
/// - Maximum value is 1 trillion
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use atomic_ledger::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(100, 0)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(100, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount or a Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Balance cannot be negative (got {0})")]
    Negative(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_AMOUNT})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 8 decimal places
    /// - `AmountError::Overflow` if value > 1 trillion
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        check_scale_and_range(value)?;

        Ok(Self(value))
    }

    /// Create an Amount from an integer (no decimal places).
    pub fn from_integer(value: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::from(value))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

fn check_scale_and_range(value: Decimal) -> Result<(), AmountError> {
    // 100.00 and 100 are the same amount; only significant digits count
    let scale = value.normalize().scale();
    if scale > MAX_SCALE {
        return Err(AmountError::TooManyDecimals(scale));
    }

    if value > max_amount() {
        return Err(AmountError::Overflow);
    }

    Ok(())
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal =
            Decimal::from_str(s.trim()).map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        format!("{:.8}", amount.0)
    }
}

/// Balance represents an account balance (can be zero or positive).
/// Unlike Amount, Balance can be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }

        check_scale_and_range(value)?;

        Ok(Self(value))
    }

    /// Wrap a value read back from the store. The column's check
    /// constraints keep it in range, so no validation happens here.
    pub(crate) fn from_stored(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the underlying value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance is sufficient for withdrawal
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance. Fails with `Overflow` past [`MAX_AMOUNT`].
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        let new_value = self
            .0
            .checked_add(amount.value())
            .ok_or(AmountError::Overflow)?;
        Balance::new(new_value)
    }

    /// Subtract amount from balance. Fails with `Negative` on overdraw.
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 - amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(dec!(100));
        assert_eq!(amount.unwrap().value(), dec!(100));
    }

    #[test]
    fn test_amount_zero_rejected() {
        let amount = Amount::new(Decimal::ZERO);
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let amount = Amount::new(dec!(-100));
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_too_many_decimals() {
        let amount = Amount::new(dec!(0.123456789));
        assert!(matches!(amount, Err(AmountError::TooManyDecimals(9))));
    }

    #[test]
    fn test_amount_trailing_zeros_do_not_count() {
        // 1.5000000000 has scale 10 but only one significant fractional digit
        let amount = Amount::new(Decimal::new(15_000_000_000, 10));
        assert!(amount.is_ok());
    }

    #[test]
    fn test_amount_overflow() {
        let amount = Amount::new(dec!(1000000000001));
        assert!(matches!(amount, Err(AmountError::Overflow)));

        assert!(Amount::new(dec!(1000000000000)).is_ok());
    }

    #[test]
    fn test_amount_from_str() {
        let amount: Amount = " 123.456 ".parse().unwrap();
        assert_eq!(amount.value(), dec!(123.456));

        let garbage: Result<Amount, _> = "12abc".parse();
        assert!(matches!(garbage, Err(AmountError::ParseError(_))));
    }

    #[test]
    fn test_amount_serde_as_string() {
        let amount: Amount = serde_json::from_str("\"200.5\"").unwrap();
        assert_eq!(amount.value(), dec!(200.5));
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"200.50000000\"");

        let rejected: Result<Amount, _> = serde_json::from_str("\"0\"");
        assert!(rejected.is_err());
    }

    #[test]
    fn test_balance_accepts_zero_rejects_negative() {
        assert_eq!(Balance::new(Decimal::ZERO).unwrap().value(), Decimal::ZERO);
        assert!(matches!(
            Balance::new(dec!(-0.01)),
            Err(AmountError::Negative(_))
        ));
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::new(Decimal::ZERO).unwrap();
        let amount = Amount::from_integer(100).unwrap();

        let balance = balance.credit(&amount).unwrap();
        assert_eq!(balance.value(), dec!(100));

        let withdraw = Amount::from_integer(30).unwrap();
        let balance = balance.debit(&withdraw).unwrap();
        assert_eq!(balance.value(), dec!(70));
    }

    #[test]
    fn test_balance_insufficient() {
        let balance = Balance::new(dec!(50)).unwrap();
        let amount = Amount::from_integer(100).unwrap();

        assert!(!balance.is_sufficient_for(&amount));
        assert!(matches!(
            balance.debit(&amount),
            Err(AmountError::Negative(_))
        ));
    }

    #[test]
    fn test_balance_credit_stops_at_max() {
        let full = Balance::new(max_amount()).unwrap();
        assert!(matches!(
            full.credit(&Amount::new(dec!(0.00000001)).unwrap()),
            Err(AmountError::Overflow)
        ));

        let near = Balance::new(max_amount() - dec!(10)).unwrap();
        let topped = near.credit(&Amount::from_integer(10).unwrap()).unwrap();
        assert_eq!(topped.value(), max_amount());
    }
}
