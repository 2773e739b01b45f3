//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use crate::{Result, ShopError};

/// Money value object. Single currency, exact decimal arithmetic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn times(&self, qty: Quantity) -> Money { Money(self.0 * Decimal::from(qty.value())) }

    /// Renders the amount with exactly two fractional digits.
    pub fn to_fixed(&self) -> String {
        let mut rounded = self.0.round_dp(2);
        rounded.rescale(2);
        rounded.to_string()
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, other: Money) -> Money { Money(self.0 + other.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Self(amount) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_fixed()) }
}

/// Line quantity. Always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i32) -> Result<Self> {
        if value <= 0 { return Err(ShopError::InvalidQuantity); }
        Ok(Self(value))
    }
    pub fn value(&self) -> i32 { self.0 }

    /// Merges two quantities, saturating instead of overflowing.
    pub fn merge(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl TryFrom<i32> for Quantity {
    type Error = ShopError;
    fn try_from(value: i32) -> Result<Self> { Self::new(value) }
}

impl From<Quantity> for i32 {
    fn from(q: Quantity) -> i32 { q.0 }
}
