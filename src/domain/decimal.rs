//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Provides canonical parsing from strings, formatting without exponent notation,
//! and the two-place rounding used for every monetary output.

use rust_decimal::prelude::RoundingStrategy;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Fixed-point precision of persisted monetary values.
pub const MONEY_DP: u32 = 2;

/// Lossless decimal numeric type for financial calculations.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Round half away from zero to the storage precision of monetary columns.
    pub fn round_money(&self) -> Self {
        self.round_dp(MONEY_DP)
    }

    pub fn round_dp(&self, dp: u32) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// `self / rhs`, or `None` when `rhs` is zero.
    pub fn checked_div(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    /// `self * rhs`, or `None` when the product is out of range.
    pub fn checked_mul(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    /// `self + rhs`, or `None` when the sum is out of range.
    pub fn checked_add(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    /// Percentage `self / rhs * 100`, or zero when `rhs` is zero.
    pub fn percent_of(&self, rhs: Decimal) -> Decimal {
        self.checked_div(rhs)
            .map(|ratio| ratio * Decimal::hundred())
            .unwrap_or_default()
    }

    /// Apply a percentage rate: `self * pct / 100`.
    pub fn apply_pct(&self, pct: Decimal) -> Decimal {
        Decimal(self.0 * pct.0 / RustDecimal::ONE_HUNDRED)
    }

    pub fn min(self, other: Decimal) -> Decimal {
        Decimal(self.0.min(other.0))
    }

    pub fn max(self, other: Decimal) -> Decimal {
        Decimal(self.0.max(other.0))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl std::ops::$trait for Decimal {
            type Output = Decimal;

            fn $method(self, rhs: Decimal) -> Decimal {
                Decimal(self.0 $op rhs.0)
            }
        }

        impl std::ops::$assign_trait for Decimal {
            fn $assign_method(&mut self, rhs: Decimal) {
                *self = Decimal(self.0 $op rhs.0);
            }
        }
    };
}

forward_binop!(Add, add, AddAssign, add_assign, +);
forward_binop!(Sub, sub, SubAssign, sub_assign, -);
forward_binop!(Mul, mul, MulAssign, mul_assign, *);
// Division panics on a zero divisor; use `checked_div` where it can be zero.
forward_binop!(Div, div, DivAssign, div_assign, /);

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}

impl<'a> Sum<&'a Decimal> for Decimal {
    fn sum<I: Iterator<Item = &'a Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| acc + *d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_canonical_no_exponent() {
        let formatted = d("123.4500").to_canonical_string();
        assert!(!formatted.contains('e'));
        assert_eq!(formatted, "123.45");
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = d("10.5");
        let b = d("2.5");

        assert_eq!((a + b).to_canonical_string(), "13");
        assert_eq!((a - b).to_canonical_string(), "8");
        assert_eq!((a * b).to_canonical_string(), "26.25");
        assert_eq!((a / b).to_canonical_string(), "4.2");
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(d("1333.335").round_money(), d("1333.34"));
        assert_eq!(d("-1333.335").round_money(), d("-1333.34"));
        assert_eq!(d("103.333333").round_money(), d("103.33"));
    }

    #[test]
    fn test_checked_div_by_zero() {
        assert_eq!(d("10").checked_div(Decimal::zero()), None);
        assert_eq!(d("10").checked_div(d("4")), Some(d("2.5")));
    }

    #[test]
    fn test_checked_mul_out_of_range() {
        assert_eq!(d("1.5").checked_mul(d("4")), Some(d("6")));
        assert_eq!(d("100000000000000").checked_mul(d("1000000000000000")), None);
    }

    #[test]
    fn test_percent_of_guards_zero() {
        assert_eq!(d("25").percent_of(d("200")), d("12.5"));
        assert_eq!(d("25").percent_of(Decimal::zero()), Decimal::zero());
    }

    #[test]
    fn test_apply_pct() {
        assert_eq!(d("100000").apply_pct(d("0.03")), d("30"));
    }

    #[test]
    fn test_sum() {
        let values = [d("1.1"), d("2.2"), d("3.3")];
        let total: Decimal = values.iter().sum();
        assert_eq!(total, d("6.6"));
    }

    #[test]
    fn test_decimal_json_serialization() {
        let json = serde_json::to_value(d("123.456")).unwrap();
        assert!(json.is_number());
        assert_eq!(json.to_string(), "123.456");
    }

    #[test]
    fn test_sign_predicates() {
        assert!(d("0.01").is_positive());
        assert!(d("-0.01").is_negative());
        assert!(!Decimal::zero().is_positive());
        assert!(!Decimal::zero().is_negative());
    }
}
