//! # Money Module
//!
//! Provides the `Money` type for prices, tenders and register totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Prices, payments and register totals are added together many times   │
//! │  per shift. Floating point drifts; integers do not.                    │
//! │                                                                         │
//! │  Every amount is stored in tiyin (1/100 of a sum):                     │
//! │    12 500.50 sum  →  1_250_050                                         │
//! │                                                                         │
//! │  The database, the wire format and all arithmetic use this unit.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use market_core::money::Money;
//!
//! let price = Money::from_minor(1_250_050);
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.map(|m| m.minor()), Some(2_500_100));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

/// A monetary value in the smallest currency unit.
///
/// Signed so that intermediate differences (e.g. a discount larger than the
/// line) are representable before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from whole and fractional parts.
    ///
    /// ```rust
    /// use market_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(125, 50).minor(), 12_550);
    /// assert_eq!(Money::from_major_minor(-5, 50).minor(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the fractional portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity. `None` on overflow.
    ///
    /// ## User Workflow
    /// ```text
    /// Scan "123" at 4 500.00 (third time)
    ///      │
    ///      ▼
    /// multiply_quantity(3) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line total: 13 500.00
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Adds two amounts. `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Applies a percentage discount given in basis points (1000 = 10%).
    ///
    /// ```rust
    /// use market_core::money::Money;
    ///
    /// let subtotal = Money::from_minor(10_000);
    /// assert_eq!(subtotal.apply_percentage_discount(1000).minor(), 9_000);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        // Half-up rounding on the discount amount.
        let discount_amount = (self.0 as i128 * discount_bps as i128 + 5000) / 10000;
        Money::from_minor((self.0 as i128 - discount_amount).clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Clamps negative values to zero.
    #[inline]
    pub fn floor_zero(self) -> Money {
        if self.0 < 0 {
            Money::zero()
        } else {
            self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================
//
// Operators saturate at the i64 bounds. Use `checked_add` and
// `multiply_quantity` where overflow must be reported.

/// Debug-friendly rendering: `12500.50`. Clients format for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(1099);
        assert_eq!(money.minor(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(1_250_050).to_string(), "12500.50");
        assert_eq!(Money::from_minor(500).to_string(), "5.00");
        assert_eq!(Money::from_minor(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.minor(), 2000);
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let max = Money::from_minor(i64::MAX);
        assert_eq!(max.checked_add(Money::from_minor(1)), None);
        assert_eq!(
            Money::from_minor(20).checked_add(Money::from_minor(22)),
            Some(Money::from_minor(42))
        );

        assert_eq!(Money::from_minor(i64::MAX / 2 + 1).multiply_quantity(2), None);
        assert_eq!(Money::from_minor(4500).multiply_quantity(3), Some(Money::from_minor(13_500)));
    }

    #[test]
    fn test_operators_saturate() {
        let max = Money::from_minor(i64::MAX);
        assert_eq!(max + Money::from_minor(1), max);
        assert_eq!(max * 2, max);
        assert_eq!(Money::from_minor(i64::MIN) - Money::from_minor(1), Money::from_minor(i64::MIN));

        let total: Money = [max, max].into_iter().sum();
        assert_eq!(total, max);
    }

    #[test]
    fn test_percentage_discount_rounds_half_up() {
        // 10% of 1005 = 100.5 → 101
        assert_eq!(Money::from_minor(1005).apply_percentage_discount(1000).minor(), 904);
    }

    #[test]
    fn test_floor_zero() {
        assert_eq!(Money::from_minor(-1).floor_zero(), Money::zero());
        assert_eq!(Money::from_minor(7).floor_zero().minor(), 7);
    }
}
