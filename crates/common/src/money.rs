//! Money amounts in whole yen.

use serde::{Deserialize, Serialize};

/// An amount of money in yen.
///
/// Prices and order totals are whole numbers, so the amount is stored as an
/// integer. Arithmetic that could overflow is exposed through checked
/// variants only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from whole yen.
    pub const fn from_yen(yen: i64) -> Self {
        Self(yen)
    }

    /// Returns zero yen.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in yen.
    pub const fn yen(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, returning `None` on overflow.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            write!(f, "-¥{}", self.0.unsigned_abs())
        } else {
            write!(f, "¥{}", self.0)
        }
    }
}
