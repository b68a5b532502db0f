//! Weight of deposited waste in kilograms.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div};
use std::str::FromStr;

/// A weight in kilograms.
///
/// Parses `12.5`, `12,5` (Indonesian decimal comma) and either of those followed by `kg`.
/// Displays as `12.5 kg`. Serializes as the plain decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Weight(Decimal);

impl Weight {
    pub const ZERO: Weight = Weight(Decimal::ZERO);

    pub const fn new(kg: Decimal) -> Self {
        Self(kg)
    }

    /// Whole kilograms.
    pub fn kg(kg: i64) -> Self {
        Self(Decimal::from(kg))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        !self.0.is_zero() && self.0.is_sign_positive()
    }

    pub fn to_plain_string(&self) -> String {
        self.0.to_string()
    }
}

/// Returned when a string cannot be parsed into a `Weight`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightError(String);

impl Display for WeightError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid weight '{}'", self.0)
    }
}

impl std::error::Error for WeightError {}

impl FromStr for Weight {
    type Err = WeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_suffix("kg")
            .or_else(|| trimmed.strip_suffix("KG"))
            .unwrap_or(trimmed)
            .trim();
        if number.contains('.') && number.contains(',') {
            return Err(WeightError(s.to_string()));
        }
        let normalized = number.replace(',', ".");
        Decimal::from_str(&normalized)
            .map(Weight)
            .map_err(|_| WeightError(s.to_string()))
    }
}

impl Display for Weight {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} kg", self.0.normalize())
    }
}

impl Serialize for Weight {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_plain_string())
    }
}

impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Weight::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Add for Weight {
    type Output = Weight;

    fn add(self, rhs: Self) -> Self::Output {
        Weight(self.0 + rhs.0)
    }
}

impl AddAssign for Weight {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Div<Decimal> for Weight {
    type Output = Weight;

    fn div(self, rhs: Decimal) -> Self::Output {
        Weight(self.0 / rhs)
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Weight::ZERO, |acc, w| acc + w)
    }
}
