//! Amount type for handling monetary values in Indonesian Rupiah.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles parsing values that
//! may be written either as plain decimals (`50000`, `1234.5`) or in Rupiah style with the
//! Indonesian separators (`Rp50.000`, `Rp 1.234,50`).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Represents an amount of money in Rupiah.
///
/// Two string forms are understood:
/// - Plain decimals, which is also the serialized form: `"50000"`, `"1234.50"`.
/// - Rupiah style, introduced by `Rp`: a period groups thousands and a comma separates the
///   fraction, e.g. `Rp50.000` or `Rp 1.234,50`.
///
/// `Display` always writes Rupiah style. Serialization always writes the plain decimal so that
/// values survive a round trip through JSON or the database exactly, including their scale.
///
/// # Examples
///
/// ```
/// # use banksampah::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("Rp50.000").unwrap();
/// let b = Amount::from_str("50000").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "Rp50.000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    pub const ZERO: Amount = Amount {
        value: Decimal::ZERO,
    };

    /// Creates a new Amount from a Decimal value.
    pub const fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Creates an Amount of whole Rupiah.
    pub fn rupiah(value: i64) -> Self {
        Self::new(Decimal::from(value))
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.value().is_sign_positive()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value().is_sign_negative()
    }

    /// Rounds to whole Rupiah, halves away from zero.
    pub fn round_rupiah(&self) -> Self {
        Self::new(
            self.value
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// `self + rhs`, or `None` when the sum does not fit.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.value.checked_add(rhs.value).map(Self::new)
    }

    /// `self - rhs`, or `None` when the difference does not fit.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.value.checked_sub(rhs.value).map(Self::new)
    }

    /// The plain decimal form, e.g. `50000` or `1234.50`.
    pub fn to_plain_string(&self) -> String {
        self.value.to_string()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };

        let plain = match strip_currency(unsigned) {
            // Rupiah style: '.' groups thousands and ',' is the decimal separator
            Some(rest) => rest.trim().replace('.', "").replace(',', "."),
            None => unsigned.to_string(),
        };

        let value = Decimal::from_str(&plain).map_err(AmountError)?;
        Ok(Amount::new(if negative { -value } else { value }))
    }
}

fn strip_currency(s: &str) -> Option<&str> {
    s.strip_prefix("Rp")
        .or_else(|| s.strip_prefix("rp"))
        .or_else(|| s.strip_prefix("RP"))
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let num = self.value().abs();
        let pattern_has_fraction = !num.fract().is_zero();
        // format_num groups with ',' and uses '.' for the fraction; Rupiah style is the reverse.
        let formatted = if pattern_has_fraction {
            format_num::format_num!(",.2", num.to_f64().unwrap_or_default())
        } else {
            format_num::format_num!(",.0", num.to_f64().unwrap_or_default())
        };
        let swapped: String = formatted
            .chars()
            .map(|c| match c {
                ',' => '.',
                '.' => ',',
                other => other,
            })
            .collect();
        write!(f, "{sign}Rp{swapped}")
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_plain_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount::new(self.value + rhs.value)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount::new(self.value - rhs.value)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.value += rhs.value;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.value -= rhs.value;
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        Amount::new(-self.value)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + *a)
    }
}
