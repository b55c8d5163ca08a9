//! # Money Module
//!
//! Provides the `Money` and `Percent` types used by every amount and rate in
//! a sale.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Arithmetic happens on i64 cents. Records still carry plain JSON      │
//! │    numbers in major units ("price": 10.99), converted at the serde      │
//! │    boundary and rounded to the nearest cent.                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::{Money, Percent};
//!
//! let subtotal = Money::from_cents(10000);          // $100.00
//! let discounted = subtotal.apply_discount(Percent::from_bps(1000)); // 10% off
//! assert_eq!(discounted.cents(), 9000);
//!
//! let tax = discounted.percent_of(Percent::from_percentage(8.5));
//! assert_eq!(tax.cents(), 765);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Wire Format
/// Serialized as a JSON number in major units: `Money::from_cents(10265)`
/// becomes `102.65`. Deserialization rounds to the nearest cent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Largest amount a sale field may carry: $100,000,000,000.00.
    ///
    /// Line totals and sums of amounts up to this bound stay far inside
    /// i64, so validated requests never reach the saturation edge.
    pub const MAX: Money = Money(10_000_000_000_000);

    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -$5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Converts a major-unit float (as found in JSON records) to Money,
    /// rounding half away from zero to the nearest cent.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(102.65).cents(), 10265);
    /// assert_eq!(Money::from_major(0.1 + 0.2).cents(), 30);
    /// ```
    ///
    /// Out-of-range input saturates at `i64::MIN`/`i64::MAX` cents.
    pub fn from_major(amount: f64) -> Self {
        Money((amount * 100.0).round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value in major units (for serialization and display only).
    #[inline]
    pub fn as_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
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
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Absolute difference in cents between two amounts.
    #[inline]
    pub const fn distance(&self, other: Money) -> i64 {
        self.0.saturating_sub(other.0).saturating_abs()
    }

    /// Multiplies money by a quantity, saturating at the i64 bounds.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let line_total = Money::from_cents(299).multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Multiplies by a quantity, or `None` on i64 overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, or `None` on i64 overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `rate` percent of this amount, rounded half up to the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128.
    ///
    /// ```rust
    /// use till_core::money::{Money, Percent};
    ///
    /// // $10.00 × 8.25% = $0.825 → $0.83
    /// let tax = Money::from_cents(1000).percent_of(Percent::from_bps(825));
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn percent_of(&self, rate: Percent) -> Money {
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money(cents.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    /// Subtracts `discount` percent of this amount.
    ///
    /// ```rust
    /// use till_core::money::{Money, Percent};
    ///
    /// let discounted = Money::from_cents(10000).apply_discount(Percent::from_percentage(10.0));
    /// assert_eq!(discounted.cents(), 9000);
    /// ```
    pub fn apply_discount(&self, discount: Percent) -> Money {
        *self - self.percent_of(discount)
    }
}

// Arithmetic saturates instead of wrapping or panicking. Validation keeps
// request amounts at or below `Money::MAX`, so saturation only shows up on
// input that is rejected anyway.

/// Display for logs and error messages. UI formatting belongs to the
/// frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        if !amount.is_finite() {
            return Err(serde::de::Error::custom("amount must be a finite number"));
        }
        Ok(Money::from_major(amount))
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage held in basis points (1 bps = 0.01%).
///
/// ## Why Basis Points?
/// `tax_rate: 8.5` in a record becomes `Percent(850)`; every calculation stays
/// in integers. Serialized back as the plain percentage number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Percent(u32);

impl Percent {
    /// 100% in basis points.
    pub const FULL_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a rate from a percentage, rounded to the nearest basis point.
    /// Negative input saturates at zero.
    pub fn from_percentage(pct: f64) -> Self {
        Percent((pct * 100.0).round().max(0.0) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display and serialization).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percentage())
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.percentage())
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pct = f64::deserialize(deserializer)?;
        if !pct.is_finite() || pct < 0.0 {
            return Err(serde::de::Error::custom(
                "percentage must be a non-negative number",
            ));
        }
        Ok(Percent::from_percentage(pct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_serializes_as_major_units() {
        let json = serde_json::to_string(&Money::from_cents(10265)).unwrap();
        assert_eq!(json, "102.65");

        let parsed: Money = serde_json::from_str("19.99").unwrap();
        assert_eq!(parsed.cents(), 1999);

        let integer: Money = serde_json::from_str("5").unwrap();
        assert_eq!(integer.cents(), 500);
    }

    #[test]
    fn test_percent_wire_format() {
        let rate: Percent = serde_json::from_str("8.5").unwrap();
        assert_eq!(rate.bps(), 850);
        assert_eq!(serde_json::to_string(&rate).unwrap(), "8.5");
        assert!(serde_json::from_str::<Percent>("-1").is_err());
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        let amount = Money::from_cents(1000);
        assert_eq!(amount.percent_of(Percent::from_bps(1000)).cents(), 100);
        assert_eq!(amount.percent_of(Percent::from_bps(825)).cents(), 83);
    }

    #[test]
    fn test_apply_discount() {
        let subtotal = Money::from_cents(10000);
        assert_eq!(subtotal.apply_discount(Percent::from_bps(1000)).cents(), 9000);
        assert_eq!(subtotal.apply_discount(Percent::zero()), subtotal);
    }

    #[test]
    fn test_sum_and_arithmetic() {
        let lines = [Money::from_cents(1000), Money::from_cents(2000), Money::from_cents(3000)];
        let total: Money = lines.iter().sum();
        assert_eq!(total.cents(), 6000);
        assert_eq!((total - Money::from_cents(500)).cents(), 5500);
        assert_eq!((Money::from_cents(250) * 4).cents(), 1000);
        assert_eq!(Money::from_cents(1000).distance(Money::from_cents(1003)), 3);
    }

    #[test]
    fn test_huge_amounts_saturate_instead_of_panicking() {
        let huge = Money::from_major(1e17);
        assert_eq!(huge.cents(), i64::MAX);

        assert_eq!(huge.multiply_quantity(2).cents(), i64::MAX);
        assert_eq!((huge * 2).cents(), i64::MAX);
        assert_eq!((huge + huge).cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - huge).cents(), i64::MIN);
        assert_eq!([huge, huge, huge].iter().sum::<Money>().cents(), i64::MAX);
        assert_eq!(huge.percent_of(Percent::from_bps(20_000)).cents(), i64::MAX);
        assert_eq!(Money::from_cents(i64::MIN).distance(huge), i64::MAX);

        assert_eq!(huge.checked_multiply_quantity(2), None);
        assert_eq!(huge.checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(299).checked_multiply_quantity(3),
            Some(Money::from_cents(897))
        );
    }

    #[test]
    fn test_max_line_total_fits() {
        let line = Money::MAX.checked_multiply_quantity(crate::MAX_ITEM_QUANTITY);
        assert!(line.is_some());
    }
}
