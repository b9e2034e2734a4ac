use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoneyError {
    #[error("amount is empty")]
    Empty,
    #[error("amount '{0}' is not a plain decimal number")]
    Unparseable(String),
    #[error("amount {0} is not a finite number")]
    NotFinite(f64),
}

/// A two-decimal currency amount. Serializes as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn to_cents(self) -> Option<i64> {
        (self.0 * Decimal::from(100)).round().to_i64()
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(2))
    }

    pub fn from_f64(value: f64) -> Result<Self, MoneyError> {
        Decimal::try_from(value)
            .map(Money::from_decimal)
            .map_err(|_| MoneyError::NotFinite(value))
    }

    /// Parse amount text as produced by bill extraction, e.g. `"$45.67"`.
    ///
    /// Only a single leading `$` is stripped. Thousands separators and currency
    /// codes are rejected rather than guessed at.
    pub fn parse_amount(text: &str) -> Result<Self, MoneyError> {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix('$').unwrap_or(trimmed).trim_start();
        if digits.is_empty() {
            return Err(MoneyError::Empty);
        }
        if digits.contains([',', '_']) {
            return Err(MoneyError::Unparseable(text.to_string()));
        }
        Decimal::from_str(digits)
            .map(Money::from_decimal)
            .map_err(|_| MoneyError::Unparseable(text.to_string()))
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_strips_leading_dollar() {
        assert_eq!(Money::parse_amount("$45.67").unwrap(), Money::from_cents(4567));
        assert_eq!(Money::parse_amount("45.67").unwrap(), Money::from_cents(4567));
        assert_eq!(Money::parse_amount("  $ 12 ").unwrap(), Money::from_cents(1200));
    }

    #[test]
    fn parse_amount_rounds_to_cents() {
        assert_eq!(Money::parse_amount("1.005").unwrap().to_cents(), Some(100));
        assert_eq!(Money::parse_amount("2.499").unwrap().to_cents(), Some(250));
    }

    #[test]
    fn parse_amount_rejects_thousands_separator_and_codes() {
        assert!(matches!(Money::parse_amount("1,234.56"), Err(MoneyError::Unparseable(_))));
        assert!(matches!(Money::parse_amount("45.67 USD"), Err(MoneyError::Unparseable(_))));
        assert!(matches!(Money::parse_amount("$$5"), Err(MoneyError::Unparseable(_))));
    }

    #[test]
    fn parse_amount_empty() {
        assert_eq!(Money::parse_amount(""), Err(MoneyError::Empty));
        assert_eq!(Money::parse_amount("$"), Err(MoneyError::Empty));
    }

    #[test]
    fn from_f64_rejects_nan() {
        assert!(Money::from_f64(f64::NAN).is_err());
        assert_eq!(Money::from_f64(45.67).unwrap(), Money::from_cents(4567));
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&Money::from_cents(4567)).unwrap();
        assert_eq!(json, "45.67");
        let back: Money = serde_json::from_str("45.67").unwrap();
        assert_eq!(back, Money::from_cents(4567));
    }

    #[test]
    fn display_has_two_places() {
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
    }
}
