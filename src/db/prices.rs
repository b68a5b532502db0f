//! Waste price list rows.

use super::{is_foreign_key_violation, is_unique_violation, parse_amount, Db};
use crate::model::{Amount, WastePrice};
use crate::{Error, Result};
use anyhow::Context;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

impl Db {
    /// All waste types, in the order they were added.
    pub(crate) async fn list_prices(&self) -> Result<Vec<WastePrice>> {
        let mut conn = self.pool.acquire().await?;
        all_prices(&mut conn).await
    }

    /// Finds a waste type by id, or by name ignoring case.
    pub(crate) async fn find_price(&self, id_or_name: &str) -> Result<Option<WastePrice>> {
        let row = sqlx::query(
            "SELECT id, name, price_per_kg, unit FROM waste_prices \
            WHERE id = ? OR name = ? COLLATE NOCASE ORDER BY id = ? DESC LIMIT 1",
        )
        .bind(id_or_name)
        .bind(id_or_name)
        .bind(id_or_name)
        .fetch_optional(&self.pool)
        .await
        .context("Unable to query waste price")?;
        row.as_ref().map(price_from_row).transpose()
    }

    pub(crate) async fn insert_price(&self, price: &WastePrice) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert_price(&mut conn, price).await
    }

    /// Changes the price of an existing waste type. Past deposits keep the price they were
    /// recorded with.
    pub(crate) async fn set_price(&self, id: &str, price_per_kg: Amount) -> Result<WastePrice> {
        validate_price(price_per_kg)?;
        let mut tx = self.pool.begin().await?;
        let mut price = get_price(&mut tx, id)
            .await?
            .ok_or_else(|| Error::request(format!("Waste type '{id}' not found")))?;
        sqlx::query("UPDATE waste_prices SET price_per_kg = ? WHERE id = ?")
            .bind(price_per_kg.to_plain_string())
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Unable to update waste price")?;
        tx.commit().await.context("Unable to commit price update")?;
        price.price_per_kg = price_per_kg;
        Ok(price)
    }

    /// Removes a waste type that no deposit refers to.
    pub(crate) async fn delete_price(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM waste_prices WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    Error::request(format!(
                        "Cannot remove waste type '{id}': deposits of this type are on record"
                    ))
                    .into()
                } else {
                    anyhow::Error::new(e).context("Unable to delete waste price")
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(Error::request(format!("Waste type '{id}' not found")).into());
        }
        Ok(())
    }
}

fn validate_price(price_per_kg: Amount) -> Result<()> {
    if price_per_kg.is_negative() {
        return Err(Error::request(format!("A price cannot be negative: {price_per_kg}")).into());
    }
    Ok(())
}

pub(super) async fn insert_price(conn: &mut SqliteConnection, price: &WastePrice) -> Result<()> {
    if price.id.trim().is_empty() || price.name.trim().is_empty() {
        return Err(Error::request("A waste type needs an id and a name").into());
    }
    validate_price(price.price_per_kg)?;
    sqlx::query("INSERT INTO waste_prices (id, name, price_per_kg, unit) VALUES (?, ?, ?, ?)")
        .bind(&price.id)
        .bind(&price.name)
        .bind(price.price_per_kg.to_plain_string())
        .bind(&price.unit)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::request(format!(
                    "A waste type '{}' ({}) already exists",
                    price.name, price.id
                ))
                .into()
            } else {
                anyhow::Error::new(e).context("Unable to insert waste price")
            }
        })?;
    Ok(())
}

pub(super) async fn get_price(conn: &mut SqliteConnection, id: &str) -> Result<Option<WastePrice>> {
    let row = sqlx::query("SELECT id, name, price_per_kg, unit FROM waste_prices WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Unable to query waste price")?;
    row.as_ref().map(price_from_row).transpose()
}

pub(super) async fn all_prices(conn: &mut SqliteConnection) -> Result<Vec<WastePrice>> {
    let rows = sqlx::query("SELECT id, name, price_per_kg, unit FROM waste_prices ORDER BY rowid")
        .fetch_all(&mut *conn)
        .await
        .context("Unable to read waste prices")?;
    rows.iter().map(price_from_row).collect()
}

fn price_from_row(row: &SqliteRow) -> Result<WastePrice> {
    let price: String = row.try_get("price_per_kg")?;
    Ok(WastePrice {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price_per_kg: parse_amount(&price)?,
        unit: row.try_get("unit")?,
    })
}
