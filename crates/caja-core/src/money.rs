//! Integer money.
//!
//! Amounts are whole cents end to end. A sale total has to equal the sum of
//! its line subtotals exactly, which binary floats can't promise, so decimal
//! text only appears when a value leaves the system (CSV, logs).
//!
//! ```rust
//! use caja_core::money::Money;
//!
//! let line = Money::from_cents(1099).times(3);
//! let total: Money = [line, Money::from_cents(3)].into_iter().sum();
//! assert_eq!(total.cents(), 3300);
//! assert_eq!(total.to_decimal(), "33.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use ts_rs::TS;

/// An amount in cents. Negative values are allowed but never stored.
///
/// `+` and `Sum` saturate, which keeps report aggregates from panicking.
/// Pricing uses the checked forms and rejects an order that overflows.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    #[inline]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[inline]
    pub const fn times(self, quantity: i64) -> Self {
        Self(self.0.saturating_mul(quantity))
    }

    /// Like [`Money::times`], but `None` when the result leaves `i64`.
    #[inline]
    pub const fn checked_times(self, quantity: i64) -> Option<Self> {
        match self.0.checked_mul(quantity) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Splits the amount over `count` parts, rounding half away from zero.
    /// Zero when there is nothing to split over.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1000).average_over(3).cents(), 333);
    /// assert_eq!(Money::from_cents(1001).average_over(2).cents(), 501);
    /// assert_eq!(Money::from_cents(1000).average_over(0), Money::ZERO);
    /// ```
    pub fn average_over(self, count: i64) -> Self {
        if count <= 0 {
            return Self::ZERO;
        }
        let (amount, count) = (i128::from(self.0), i128::from(count));
        let half = count / 2;
        let rounded = if amount >= 0 {
            (amount + half) / count
        } else {
            (amount - half) / count
        };
        // |rounded| <= |amount|, so it fits back into i64.
        Self(rounded as i64)
    }

    /// Plain decimal text with two places, e.g. `-0.05` or `1234.50`.
    pub fn to_decimal(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}
