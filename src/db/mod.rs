//! This module is responsible for reading, writing and managing the SQLite database.
//!
//! Every operation that changes more than one row runs inside a single SQLite transaction, so a
//! deposit either lands completely (deposit row, ledger row and savings update) or not at all,
//! and two processes writing at the same time cannot silently overwrite each other.

mod groups;
mod ledger;
mod migrations;
mod prices;
mod settings;
mod snapshot;
mod users;

pub use groups::GroupWithBalance;
pub use ledger::{DepositReceipt, WithdrawalReceipt};
pub(crate) use ledger::{DepositFilter, NewDeposit, NewWithdrawal};
pub(crate) use users::UserRow;

use crate::model::{Amount, Weight};
use crate::Result;
use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
    path: PathBuf,
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    /// - Seeds the default waste prices and settings
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at {}", path.display());
        }
        let pool = connect(path, true).await?;
        migrations::bootstrap(&pool).await?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        let db = Self {
            pool,
            path: path.to_path_buf(),
        };
        db.seed_defaults().await?;
        debug!("Initialized database at {}", path.display());
        Ok(db)
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Updates the database schema with migrations if it is out-of-date
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing '{}'", path.display());
        }
        let pool = connect(path, false).await?;
        let version = migrations::version(&pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "The database schema version {version} is newer than this program supports ({}). \
                Is a newer version of banksampah available?",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open SQLite database at {}", path.display()))
}

// Conversions between model values and their TEXT columns.

pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp '{s}' in database"))?
        .with_timezone(&Utc))
}

pub(crate) fn date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Invalid date '{s}' in database"))
}

pub(crate) fn parse_amount(s: &str) -> Result<Amount> {
    Amount::from_str(s).with_context(|| format!("Invalid amount '{s}' in database"))
}

pub(crate) fn parse_weight(s: &str) -> Result<Weight> {
    Weight::from_str(s).with_context(|| format!("Invalid weight '{s}' in database"))
}

/// True when `e` was caused by a UNIQUE constraint.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

/// True when `e` was caused by a FOREIGN KEY constraint.
pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.to_string().contains("FOREIGN KEY constraint failed")
}
