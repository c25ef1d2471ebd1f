//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(12,2)` and travel over JSON as strings
//! (`"249.50"`) so the UI never sees binary floating point.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative")]
    Negative,
    /// The input string is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// Multiplication overflowed.
    #[error("price overflow")]
    Overflow,
}

/// A non-negative amount in the store currency, rounded to two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        let mut amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(2);
        Ok(Self(amount))
    }

    /// Parse a price from a string such as `"249.5"`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Invalid` for non-numeric input and
    /// `PriceError::Negative` for negative amounts.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount: Decimal = s
            .trim()
            .parse()
            .map_err(|_| PriceError::Invalid(s.to_string()))?;
        Self::new(amount)
    }

    /// Price of `quantity` units.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the multiplication overflows.
    pub fn line_total(&self, quantity: u32) -> Result<Self, PriceError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self)
            .ok_or(PriceError::Overflow)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// ISO 4217 currency codes the store can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EGP,
    USD,
    EUR,
    GBP,
    SAR,
    AED,
}

impl CurrencyCode {
    /// The three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EGP => "EGP",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::SAR => "SAR",
            Self::AED => "AED",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EGP" => Ok(Self::EGP),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "SAR" => Ok(Self::SAR),
            "AED" => Ok(Self::AED),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_negative() {
        assert_eq!(Price::new(Decimal::new(-1, 2)), Err(PriceError::Negative));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_new_rounds_to_cents() {
        let price = Price::new(Decimal::new(12_345, 3)).unwrap();
        assert_eq!(price.to_string(), "12.35");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Price::parse(" 249.5 ").unwrap().to_string(), "249.50");
        assert_eq!(
            serde_json::to_string(&Price::parse("50").unwrap()).unwrap(),
            "\"50.00\""
        );
        assert!(matches!(Price::parse("abc"), Err(PriceError::Invalid(_))));
        assert_eq!(Price::parse("-3"), Err(PriceError::Negative));
    }

    #[test]
    fn test_line_total_and_sum() {
        let a = Price::parse("199.99").unwrap();
        let b = Price::parse("50").unwrap();
        let total: Price = [a.line_total(3).unwrap(), b.line_total(1).unwrap()]
            .into_iter()
            .sum();
        assert_eq!(total.to_string(), "649.97");
    }

    #[test]
    fn test_json_uses_strings() {
        let price = Price::parse("249.5").unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"249.50\"");
        let parsed: Price = serde_json::from_str("\"249.50\"").unwrap();
        assert_eq!(parsed, price);
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("egp".parse::<CurrencyCode>(), Ok(CurrencyCode::EGP));
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
