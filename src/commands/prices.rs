//! Waste price list command handlers. Changing the list is reserved for admins.

use crate::args::PriceAddArgs;
use crate::commands::{plural, OutputFormat, Out, Rows};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Amount, WastePrice};
use crate::{auth, Config, Error, Result};
use tracing::info;

/// Lists waste types in the order they were added.
pub async fn price_list(config: Config, format: OutputFormat) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let prices = config
        .db()
        .list_prices()
        .await
        .pub_result(ErrorType::Database)?;
    let cells = prices
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.name.clone(),
                format!("{}/{}", p.price_per_kg, p.unit),
            ]
        })
        .collect();
    let rows = Rows::render(format, &prices, &["Id", "Name", "Price"], cells)?;
    Ok(Out::new(plural(prices.len(), "waste type"), rows))
}

/// Sets the price per kilogram of a waste type found by id or name.
pub async fn price_set(config: Config, waste: &str, price: Amount) -> Result<Out<WastePrice>> {
    let user = auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let existing = find_price(&config, waste).await?;
    let updated = config
        .db()
        .set_price(&existing.id, price)
        .await
        .pub_result(ErrorType::Database)?;
    info!(
        "{} changed the price of {} from {} to {}",
        user.username, updated.name, existing.price_per_kg, updated.price_per_kg
    );
    Ok(Out::new(
        format!("{} now costs {}/{}", updated.name, updated.price_per_kg, updated.unit),
        updated,
    ))
}

/// Adds a waste type priced per kilogram.
pub async fn price_add(config: Config, args: PriceAddArgs) -> Result<Out<WastePrice>> {
    auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let price = WastePrice::new(args.id().trim(), args.name().trim(), args.price());
    config
        .db()
        .insert_price(&price)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(format!("Added waste type '{}'", price.name), price))
}

/// Removes a waste type that no deposit refers to.
pub async fn price_remove(config: Config, waste: &str) -> Result<Out<WastePrice>> {
    auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let existing = find_price(&config, waste).await?;
    config
        .db()
        .delete_price(&existing.id)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Removed waste type '{}'", existing.name),
        existing,
    ))
}

/// Resolves a waste type by id or name, or fails with a `Request` error.
pub(super) async fn find_price(config: &Config, waste: &str) -> Result<WastePrice> {
    config
        .db()
        .find_price(waste)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| Error::request(format!("Waste type '{waste}' not found")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_set_price_by_name() {
        let env = TestEnv::new().await;
        let out = price_set(env.config().clone(), "PLASTIK", Amount::rupiah(5_500))
            .await
            .unwrap();
        assert_eq!(out.message(), "Plastik now costs Rp5.500/kg");
        let stored = env.config().db().find_price("plastik").await.unwrap().unwrap();
        assert_eq!(stored.price_per_kg, Amount::rupiah(5_500));
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let env = TestEnv::new().await;
        price_add(
            env.config().clone(),
            PriceAddArgs::new("minyak", "Minyak Jelantah", Amount::rupiah(4_000)),
        )
        .await
        .unwrap();
        let listed = price_list(env.config().clone(), OutputFormat::Csv)
            .await
            .unwrap();
        assert_eq!(listed.message(), "6 waste types");
        assert!(listed
            .structure()
            .unwrap()
            .to_string()
            .contains("minyak,Minyak Jelantah,Rp4.000/kg"));

        price_remove(env.config().clone(), "Minyak Jelantah")
            .await
            .unwrap();
        assert!(env.config().db().find_price("minyak").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_operator_cannot_change_prices() {
        let env = TestEnv::new().await;
        env.login_operator("budi").await;
        let err = price_set(env.config().clone(), "kaca", Amount::rupiah(1))
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Auth));
        // reading is allowed
        price_list(env.config().clone(), OutputFormat::Table)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_waste_type() {
        let env = TestEnv::new().await;
        let err = price_remove(env.config().clone(), "emas").await.unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
    }
}
