//! Fixed-point currency amounts.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::DomainError;

/// A currency amount with exactly two decimal places.
///
/// Every constructor and arithmetic operation rounds half away from zero to
/// two places, matching `ROUND(numeric, 2)` in Postgres, so a value computed
/// in process and the value the store returns agree. Arithmetic is checked:
/// overflow is a validation error, never a panic.
///
/// Serializes as a JSON number; deserializes from a number or a decimal
/// string, rounding on the way in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(from = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const SCALE: u32 = 2;

    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Whole currency units (no fractional part).
    pub fn from_major(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Amount that must be strictly positive (transaction amounts).
    pub fn positive(value: Decimal) -> Result<Self, DomainError> {
        let money = Self::new(value);
        if !money.is_positive() {
            return Err(DomainError::validation("amount must be positive"));
        }
        Ok(money)
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Largest magnitude a stored balance or amount can take (`NUMERIC(18,2)`).
    pub fn max_storable() -> Self {
        Self(Decimal::new(999_999_999_999_999_999, Self::SCALE))
    }

    pub fn is_storable(self) -> bool {
        self.0.abs() <= Self::max_storable().0
    }

    pub fn checked_add(self, rhs: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(rhs.0)
            .map(Money::new)
            .ok_or_else(|| DomainError::validation("amount out of range"))
    }

    pub fn checked_sub(self, rhs: Money) -> Result<Money, DomainError> {
        self.0
            .checked_sub(rhs.0)
            .map(Money::new)
            .ok_or_else(|| DomainError::validation("amount out of range"))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
