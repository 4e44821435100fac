//! Exact decimal money amounts.
//!
//! Every amount in the ledger is a `Money`, a thin wrapper around
//! [`rust_decimal::Decimal`]. Amounts are built from strings or scaled
//! integers, never from floating point, so `"0.10"` is exactly ten cents.
//!
//! # Examples
//!
//! ```
//! use balance_ledger::models::money::Money;
//!
//! let amount: Money = "10.50".parse().unwrap();
//! assert_eq!(amount, Money::from_minor_units(1050));
//! assert_eq!(amount.to_fixed(2), "10.50");
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits amounts are rendered and stored with.
pub const MINOR_UNIT_DIGITS: u32 = 2;

/// A signed, exact decimal amount of money.
///
/// Equality is exact decimal equality: `1.0 == 1.00`, and there is no
/// epsilon tolerance anywhere.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Money(Decimal);

/// Failure to parse a string into [`Money`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{input:?} is not a decimal amount")]
pub struct ParseMoneyError {
    input: String,
}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Largest amount a balance or a single operation may carry.
    ///
    /// Matches the `NUMERIC(20, 2)` columns: `999999999999999999.99`.
    pub const MAX: Money = Money(Decimal::from_parts(
        1_661_992_959,
        1_808_227_885,
        5,
        false,
        MINOR_UNIT_DIGITS,
    ));

    /// Build an amount from an integer count of minor units (cents).
    ///
    /// `Money::from_minor_units(1050)` is `10.50`.
    pub const fn from_minor_units(units: i64) -> Self {
        Money(Decimal::from_parts(
            units.unsigned_abs() as u32,
            (units.unsigned_abs() >> 32) as u32,
            0,
            units < 0,
            MINOR_UNIT_DIGITS,
        ))
    }

    /// Build an amount from an integer count of `10^-scale` units.
    ///
    /// Returns `None` when `scale` exceeds what a decimal can hold (28).
    pub fn try_from_minor_units(units: i64, scale: u32) -> Option<Self> {
        Decimal::try_new(units, scale).ok().map(Money)
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Money(value)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Strictly less than zero.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Count of significant fractional digits (`1.50` has one).
    pub fn fractional_digits(&self) -> u32 {
        self.0.normalize().scale()
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Multiply by an exchange rate. Display conversion only.
    pub fn mul_rate(self, rate: Decimal) -> Option<Money> {
        self.0.checked_mul(rate).map(Money)
    }

    /// Divide by an exchange rate. Returns `None` for a zero rate.
    pub fn div_rate(self, rate: Decimal) -> Option<Money> {
        self.0.checked_div(rate).map(Money)
    }

    /// Round to `digits` fractional digits, midpoint away from zero.
    pub fn round_to(self, digits: u32) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Render with exactly `digits` fractional digits.
    ///
    /// `Money::from_minor_units(500).to_fixed(2)` is `"5.00"`.
    pub fn to_fixed(&self, digits: u32) -> String {
        let mut rounded = self.round_to(digits).0;
        rounded.rescale(digits);
        if rounded.is_zero() {
            rounded.set_sign_positive(true);
        }
        rounded.to_string()
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseMoneyError {
                input: input.to_string(),
            });
        }
        Decimal::from_str_exact(trimmed)
            .map(Money)
            .map_err(|_| ParseMoneyError {
                input: input.to_string(),
            })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Add for Money {
    type Output = Money;

    /// # Panics
    ///
    /// On overflow, like [`Decimal`]. Use [`Money::checked_add`] for untrusted input.
    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Money;

    /// # Panics
    ///
    /// On overflow, like [`Decimal`]. Use [`Money::checked_sub`] for untrusted input.
    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_decimal_strings_exactly() {
        let amount: Money = "0.10".parse().unwrap();
        assert_eq!(amount.as_decimal(), dec!(0.10));

        let sum = amount + "0.20".parse::<Money>().unwrap();
        assert_eq!(sum, "0.3".parse::<Money>().unwrap());
    }

    #[test]
    fn rejects_non_decimal_input() {
        for input in ["", "  ", "abc", "1,5", "1.2.3", "NaN"] {
            assert!(input.parse::<Money>().is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn equality_ignores_trailing_zeros() {
        assert_eq!(
            "100".parse::<Money>().unwrap(),
            "100.000".parse::<Money>().unwrap()
        );
    }

    #[test]
    fn sign_checks() {
        assert!(Money::from_minor_units(1).is_positive());
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
        assert!((-Money::from_minor_units(1)).is_negative());
    }

    #[test]
    fn fractional_digits_are_significant_only() {
        assert_eq!("1.50".parse::<Money>().unwrap().fractional_digits(), 1);
        assert_eq!("1.005".parse::<Money>().unwrap().fractional_digits(), 3);
        assert_eq!("12".parse::<Money>().unwrap().fractional_digits(), 0);
    }

    #[test]
    fn renders_fixed_point() {
        assert_eq!(Money::from_minor_units(500).to_fixed(2), "5.00");
        assert_eq!("2.345".parse::<Money>().unwrap().to_fixed(2), "2.35");
        assert_eq!("-2.345".parse::<Money>().unwrap().to_fixed(2), "-2.35");
        assert_eq!("-0.001".parse::<Money>().unwrap().to_fixed(2), "0.00");
    }

    #[test]
    fn rate_arithmetic() {
        let amount = Money::from_minor_units(10000);
        assert_eq!(amount.mul_rate(dec!(1.5)), Some(Money::from_minor_units(15000)));
        assert_eq!(amount.div_rate(dec!(4)), Some(Money::from_minor_units(2500)));
        assert_eq!(amount.div_rate(Decimal::ZERO), None);
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let max = Money::from_decimal(Decimal::MAX);
        assert_eq!(max.checked_add(Money::from_minor_units(100)), None);
        assert_eq!(
            Money::ZERO.checked_sub(Money::from_minor_units(300)),
            Some(Money::from_minor_units(-300))
        );
    }

    #[test]
    fn minor_units_constructors() {
        assert_eq!(Money::from_minor_units(1050), "10.50".parse::<Money>().unwrap());
        assert_eq!(Money::from_minor_units(-1), "-0.01".parse::<Money>().unwrap());
        assert_eq!(
            Money::from_minor_units(i64::MIN).as_decimal(),
            Decimal::from_i128_with_scale(i64::MIN as i128, 2)
        );
        assert_eq!(
            Money::try_from_minor_units(15, 1),
            Some("1.5".parse::<Money>().unwrap())
        );
        assert_eq!(Money::try_from_minor_units(1, 29), None);
    }

    #[test]
    fn max_matches_column_precision() {
        assert_eq!(Money::MAX, "999999999999999999.99".parse::<Money>().unwrap());
        assert_eq!(Money::MAX.to_fixed(2), "999999999999999999.99");
    }

    #[test]
    #[should_panic]
    fn add_operator_panics_on_overflow() {
        let _ = Money::from_decimal(Decimal::MAX) + Money::from_minor_units(100);
    }

    #[test]
    fn sums_amounts() {
        let total: Money = ["100", "-40", "0.5"]
            .iter()
            .map(|s| s.parse::<Money>().unwrap())
            .sum();
        assert_eq!(total, "60.5".parse::<Money>().unwrap());
    }
}
