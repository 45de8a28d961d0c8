//! Value Objects for the storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Money value object.
///
/// The store trades in a single currency (INR), so the amount is the whole
/// value. Every constructor rounds to paise, half away from zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Money(Decimal);

pub const CURRENCY: &str = "INR";

pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl Money {
    pub fn new(amount: Decimal) -> Self { Self(round2(amount)) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn from_major(units: i64) -> Self { Self(Decimal::new(units, 0)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn is_positive(&self) -> bool { self.0 > Decimal::ZERO }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.0 * Decimal::from(qty)) }
    pub fn scale(&self, factor: Decimal) -> Money { Money::new(self.0 * factor) }
    pub fn percent(&self, pct: Percent) -> Money { Money::new(self.0 * pct.value() / Decimal::ONE_HUNDRED) }
    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        if other.0 > self.0 { None } else { Some(Money(self.0 - other.0)) }
    }
    pub fn saturating_sub(&self, other: Money) -> Money { self.checked_sub(other).unwrap_or_default() }

    /// Whole paise, as payment gateways expect.
    pub fn to_paise(&self) -> i64 {
        (self.0 * Decimal::ONE_HUNDRED).trunc().to_i64().unwrap_or(i64::MAX)
    }
    pub fn from_paise(paise: i64) -> Self { Self(Decimal::new(paise, 2)) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) { self.0 += rhs.0; }
}

/// Plain subtraction; may go negative. Use `checked_sub` for balances.
impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money(self.0 - rhs.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::zero(), |acc, m| acc + m) }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self { Money::new(value) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Rs. {:.2}", self.0) }
}

/// Percentage value object, 0..=100.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Percent(Decimal);

impl Percent {
    pub fn new(value: Decimal) -> Result<Self, PercentError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED { return Err(PercentError::OutOfRange); }
        Ok(Self(value))
    }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn value(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    /// Fraction of the price left after this discount.
    pub fn remaining_factor(&self) -> Decimal { (Decimal::ONE_HUNDRED - self.0) / Decimal::ONE_HUNDRED }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}%", self.0.normalize()) }
}

#[derive(Debug, Clone)] pub enum PercentError { OutOfRange }
impl std::error::Error for PercentError {}
impl fmt::Display for PercentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Percentage must be between 0 and 100") }
}

/// Human-facing order reference, `ORD-` followed by ten digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCode(String);

impl OrderCode {
    pub fn generate() -> Self { Self(format!("ORD-{:010}", rand::random::<u32>())) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_rounds_half_up() {
        assert_eq!(Money::new(Decimal::new(10005, 3)).amount(), Decimal::new(1001, 2));
        assert_eq!(Money::new(Decimal::new(10004, 3)).amount(), Decimal::new(1000, 2));
    }

    #[test]
    fn test_money_percent_and_paise() {
        let price = Money::from_major(999);
        assert_eq!(price.percent(Percent::new(Decimal::new(18, 0)).unwrap()).amount(), Decimal::new(17982, 2));
        assert_eq!(Money::new(Decimal::new(123456, 2)).to_paise(), 123456);
        assert_eq!(Money::from_paise(5050).amount(), Decimal::new(5050, 2));
    }

    #[test]
    fn test_money_checked_sub() {
        let balance = Money::from_major(100);
        assert!(balance.checked_sub(Money::from_major(101)).is_none());
        assert_eq!(balance.checked_sub(Money::from_major(40)).unwrap(), Money::from_major(60));
    }

    #[test]
    fn test_percent_range() {
        assert!(Percent::new(Decimal::new(101, 0)).is_err());
        assert!(Percent::new(Decimal::new(-1, 0)).is_err());
        assert_eq!(Percent::new(Decimal::new(25, 0)).unwrap().remaining_factor(), Decimal::new(75, 2));
    }

    #[test]
    fn test_order_code_shape() {
        let code = OrderCode::generate();
        assert!(code.as_str().starts_with("ORD-"));
        assert_eq!(code.as_str().len(), 14);
    }
}
