//! Reading and replacing the whole record set at once, for backups, restore and reset.

use super::groups::{all_groups, insert_group};
use super::ledger::{
    all_deposits, all_savings, all_transactions, insert_deposit, insert_transaction,
    upsert_savings,
};
use super::prices::{all_prices, insert_price};
use super::settings::{get_settings, save_settings, seed_defaults};
use super::Db;
use crate::model::BankData;
use crate::Result;
use anyhow::Context;
use sqlx::SqliteConnection;
use std::path::Path;
use tracing::debug;

/// Tables holding bookkeeping data, children before parents. Users and sessions are not listed.
const DATA_TABLES: &[&str] = &[
    "transactions",
    "savings",
    "deposits",
    "rt_groups",
    "waste_prices",
    "app_settings",
];

impl Db {
    /// Reads every bookkeeping record in insertion order. Users are not included.
    pub(crate) async fn snapshot(&self) -> Result<BankData> {
        // A read transaction keeps the tables consistent with one another.
        let mut tx = self.pool.begin().await?;
        let data = BankData {
            groups: all_groups(&mut tx).await?,
            waste_prices: all_prices(&mut tx).await?,
            waste_deposits: all_deposits(&mut tx).await?,
            savings: all_savings(&mut tx).await?,
            transactions: all_transactions(&mut tx).await?,
            app_settings: get_settings(&mut tx).await?,
        };
        tx.commit().await?;
        Ok(data)
    }

    /// Replaces all bookkeeping records with `data` in one transaction. Users and sessions are
    /// kept. If any insert fails nothing changes.
    pub(crate) async fn replace_all(&self, data: &BankData) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear(&mut tx).await?;
        for group in &data.groups {
            insert_group(&mut tx, group).await?;
        }
        for price in &data.waste_prices {
            insert_price(&mut tx, price).await?;
        }
        for deposit in &data.waste_deposits {
            insert_deposit(&mut tx, deposit).await?;
        }
        for transaction in &data.transactions {
            insert_transaction(&mut tx, transaction).await?;
        }
        for savings in &data.savings {
            upsert_savings(&mut tx, savings).await?;
        }
        save_settings(&mut tx, &data.app_settings).await?;
        tx.commit().await.context("Unable to commit restored data")?;
        debug!(
            "Replaced store with {} groups, {} deposits and {} transactions",
            data.groups.len(),
            data.waste_deposits.len(),
            data.transactions.len()
        );
        Ok(())
    }

    /// Erases all bookkeeping records and puts back the default prices and settings.
    pub(crate) async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        clear(&mut tx).await?;
        seed_defaults(&mut tx).await?;
        tx.commit().await.context("Unable to commit reset")?;
        Ok(())
    }

    /// Writes a consistent copy of the database file to `path`, which must not exist.
    pub(crate) async fn copy_to(&self, path: &Path) -> Result<()> {
        sqlx::query("VACUUM INTO ?")
            .bind(path.to_string_lossy().to_string())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to copy the database to {}", path.display()))?;
        Ok(())
    }

    /// The number of groups and the number of deposit and transaction records.
    pub(crate) async fn record_counts(&self) -> Result<(i64, i64)> {
        let (groups, records): (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM rt_groups), \
            (SELECT COUNT(*) FROM deposits) + (SELECT COUNT(*) FROM transactions)",
        )
        .fetch_one(&self.pool)
        .await
        .context("Unable to count records")?;
        Ok((groups, records))
    }
}

async fn clear(conn: &mut SqliteConnection) -> Result<()> {
    for table in DATA_TABLES {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Unable to clear {table}"))?;
    }
    Ok(())
}
