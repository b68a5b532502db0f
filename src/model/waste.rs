use crate::model::{Amount, Weight};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The price paid per unit for one type of waste.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WastePrice {
    /// Short stable identifier, e.g. `plastik`.
    pub id: String,
    /// Display name, e.g. `Plastik`.
    pub name: String,
    pub price_per_kg: Amount,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    String::from("kg")
}

impl WastePrice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price_per_kg: Amount) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price_per_kg,
            unit: default_unit(),
        }
    }
}

/// The price list a new data directory starts with.
pub fn default_waste_prices() -> Vec<WastePrice> {
    vec![
        WastePrice::new("plastik", "Plastik", Amount::rupiah(5_000)),
        WastePrice::new("kertas", "Kertas", Amount::rupiah(3_000)),
        WastePrice::new("logam", "Logam", Amount::rupiah(8_000)),
        WastePrice::new("kaca", "Kaca", Amount::rupiah(2_000)),
        WastePrice::new("kardus", "Kardus", Amount::rupiah(2_500)),
    ]
}

/// A weigh-in: waste brought in by a group and converted to credit.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WasteDeposit {
    pub id: String,
    pub group_id: String,
    pub waste_type_id: String,
    pub weight_kg: Weight,
    /// The price in effect when the deposit was recorded.
    pub price_per_kg: Amount,
    /// `weight_kg * price_per_kg`, rounded to whole Rupiah.
    pub value: Amount,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub recorded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Computes the credit for a deposit: weight times price, rounded to whole Rupiah.
///
/// A product too large for a decimal is a `Request` error.
pub fn deposit_value(weight: Weight, price_per_kg: Amount) -> Result<Amount> {
    let value = weight
        .value()
        .checked_mul(price_per_kg.value())
        .ok_or_else(|| {
            Error::request(format!(
                "A deposit of {weight} at {price_per_kg}/kg is too large to record"
            ))
        })?;
    Ok(Amount::new(value).round_rupiah())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_deposit_value_plastic_example() {
        // 10 kg of plastic at Rp5.000/kg
        let value = deposit_value(Weight::kg(10), Amount::rupiah(5_000)).unwrap();
        assert_eq!(value, Amount::rupiah(50_000));
    }

    #[test]
    fn test_deposit_value_rounds_to_rupiah() {
        let weight = Weight::new(Decimal::from_str("0.3").unwrap());
        let value = deposit_value(weight, Amount::rupiah(3_333)).unwrap();
        assert_eq!(value, Amount::rupiah(1_000));
    }

    #[test]
    fn test_deposit_value_overflow_is_an_error() {
        let err = deposit_value(Weight::new(Decimal::MAX), Amount::rupiah(8_000)).unwrap_err();
        assert_eq!(Error::type_of(&err), Some(crate::ErrorType::Request));
        assert!(err.to_string().ends_with("too large to record"));
    }

    #[test]
    fn test_default_prices() {
        let prices = default_waste_prices();
        assert_eq!(prices.len(), 5);
        let plastik = prices.iter().find(|p| p.id == "plastik").unwrap();
        assert_eq!(plastik.price_per_kg, Amount::rupiah(5_000));
        assert_eq!(plastik.unit, "kg");
    }
}
