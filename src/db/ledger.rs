//! Deposits, withdrawals and the savings they change.
//!
//! A deposit writes three things: the deposit row, a `deposit` transaction, and the group's
//! savings record (created on the group's first deposit). A withdrawal writes a `withdrawal`
//! transaction and debits the savings record. Both run in a single SQLite transaction so the
//! balance check and the write cannot be interleaved with another writer.

use super::groups::get_group;
use super::prices::get_price;
use super::{date, parse_amount, parse_date, parse_ts, parse_weight, ts, Db};
use crate::model::{
    deposit_value, Amount, SavingsRecord, Transaction, TransactionKind, WasteDeposit, Weight,
};
use crate::{Error, Result};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::str::FromStr;
use tracing::debug;

/// Narrows a deposit or transaction listing. Dates are inclusive.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct DepositFilter {
    pub(crate) group_id: Option<String>,
    pub(crate) start: Option<NaiveDate>,
    pub(crate) end: Option<NaiveDate>,
    pub(crate) limit: Option<u32>,
}

/// Everything a deposit wrote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub deposit: WasteDeposit,
    pub transaction: Transaction,
    pub savings: SavingsRecord,
}

/// Everything a withdrawal wrote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    pub transaction: Transaction,
    pub savings: SavingsRecord,
}

/// The input of a deposit.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct NewDeposit {
    pub(crate) group_id: String,
    pub(crate) waste_type_id: String,
    pub(crate) weight: Weight,
    pub(crate) date: NaiveDate,
    pub(crate) notes: String,
    pub(crate) recorded_by: Option<String>,
}

/// The input of a withdrawal.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct NewWithdrawal {
    pub(crate) group_id: String,
    pub(crate) amount: Amount,
    pub(crate) date: NaiveDate,
    pub(crate) description: String,
    pub(crate) recorded_by: Option<String>,
}

const DEPOSIT_COLUMNS: &str = "id, group_id, waste_type_id, weight_kg, price_per_kg, value, date, \
    notes, recorded_by, created_at";

const TRANSACTION_COLUMNS: &str = "id, group_id, kind, amount, balance_after, description, \
    deposit_id, date, recorded_by, created_at";

const SAVINGS_COLUMNS: &str = "group_id, balance, total_deposits, total_withdrawals, \
    transaction_count, last_transaction";

impl Db {
    /// Records a weigh-in and credits its value to the group's savings.
    pub(crate) async fn record_deposit(&self, new: NewDeposit) -> Result<DepositReceipt> {
        if !new.weight.is_positive() {
            return Err(Error::request(format!(
                "The weight must be greater than zero, got {}",
                new.weight
            ))
            .into());
        }
        let mut tx = self.pool.begin().await?;
        let group = get_group(&mut tx, &new.group_id)
            .await?
            .ok_or_else(|| Error::request(format!("Group '{}' not found", new.group_id)))?;
        let price = get_price(&mut tx, &new.waste_type_id)
            .await?
            .ok_or_else(|| {
                Error::request(format!("Waste type '{}' not found", new.waste_type_id))
            })?;
        let value = deposit_value(new.weight, price.price_per_kg)?;
        if !value.is_positive() {
            return Err(Error::request(format!(
                "A deposit of {} {} is worth nothing at {}/{}",
                new.weight, price.name, price.price_per_kg, price.unit
            ))
            .into());
        }

        let savings = match get_savings(&mut tx, &group.id).await? {
            Some(mut s) => {
                s.credit(value, new.date)?;
                s
            }
            None => SavingsRecord::opened_with(&group.id, value, new.date),
        };
        let created_at = crate::utils::now();
        let deposit = WasteDeposit {
            id: crate::utils::generate_id(),
            group_id: group.id.clone(),
            waste_type_id: price.id.clone(),
            weight_kg: new.weight,
            price_per_kg: price.price_per_kg,
            value,
            date: new.date,
            notes: new.notes,
            recorded_by: new.recorded_by.clone(),
            created_at,
        };
        let transaction = Transaction {
            id: crate::utils::generate_id(),
            group_id: group.id.clone(),
            kind: TransactionKind::Deposit,
            amount: value,
            balance_after: savings.balance,
            description: format!("Setoran {} {}", price.name, new.weight),
            deposit_id: Some(deposit.id.clone()),
            date: new.date,
            recorded_by: new.recorded_by,
            created_at,
        };
        insert_deposit(&mut tx, &deposit).await?;
        insert_transaction(&mut tx, &transaction).await?;
        upsert_savings(&mut tx, &savings).await?;
        tx.commit().await.context("Unable to commit deposit")?;
        debug!(
            "Deposit {} for group {}: {} of {} worth {}",
            deposit.id, group.name, deposit.weight_kg, price.name, value
        );
        Ok(DepositReceipt {
            deposit,
            transaction,
            savings,
        })
    }

    /// Takes money out of a group's savings. Rejected when the balance is too small.
    pub(crate) async fn withdraw(&self, new: NewWithdrawal) -> Result<WithdrawalReceipt> {
        if !new.amount.is_positive() {
            return Err(Error::request(format!(
                "The withdrawal amount must be greater than zero, got {}",
                new.amount
            ))
            .into());
        }
        let mut tx = self.pool.begin().await?;
        let group = get_group(&mut tx, &new.group_id)
            .await?
            .ok_or_else(|| Error::request(format!("Group '{}' not found", new.group_id)))?;
        let mut savings = get_savings(&mut tx, &group.id).await?.ok_or_else(|| {
            Error::request(format!(
                "Insufficient balance: {} has no savings yet",
                group.name
            ))
        })?;
        if new.amount > savings.balance {
            return Err(Error::request(format!(
                "Insufficient balance: {} has {} but {} was requested",
                group.name, savings.balance, new.amount
            ))
            .into());
        }
        savings.debit(new.amount, new.date)?;
        let description = if new.description.trim().is_empty() {
            String::from("Penarikan tabungan")
        } else {
            new.description
        };
        let transaction = Transaction {
            id: crate::utils::generate_id(),
            group_id: group.id.clone(),
            kind: TransactionKind::Withdrawal,
            amount: new.amount,
            balance_after: savings.balance,
            description,
            deposit_id: None,
            date: new.date,
            recorded_by: new.recorded_by,
            created_at: crate::utils::now(),
        };
        insert_transaction(&mut tx, &transaction).await?;
        upsert_savings(&mut tx, &savings).await?;
        tx.commit().await.context("Unable to commit withdrawal")?;
        debug!(
            "Withdrawal {} for group {}: {}",
            transaction.id, group.name, new.amount
        );
        Ok(WithdrawalReceipt {
            transaction,
            savings,
        })
    }

    /// Deposits matching `filter`, newest first.
    pub(crate) async fn list_deposits(&self, filter: &DepositFilter) -> Result<Vec<WasteDeposit>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE 1 = 1"
        ));
        push_filter(&mut query, filter);
        query.push(" ORDER BY date DESC, created_at DESC, rowid DESC");
        push_limit(&mut query, filter);
        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Unable to list deposits")?;
        rows.iter().map(deposit_from_row).collect()
    }

    /// Transactions matching `filter`, newest first.
    pub(crate) async fn list_transactions(&self, filter: &DepositFilter) -> Result<Vec<Transaction>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE 1 = 1"
        ));
        push_filter(&mut query, filter);
        query.push(" ORDER BY date DESC, created_at DESC, rowid DESC");
        push_limit(&mut query, filter);
        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Unable to list transactions")?;
        rows.iter().map(transaction_from_row).collect()
    }

    /// All savings records, largest balance first.
    pub(crate) async fn list_savings(&self) -> Result<Vec<SavingsRecord>> {
        let mut conn = self.pool.acquire().await?;
        let mut savings = all_savings(&mut conn).await?;
        savings.sort_by(|a, b| b.balance.cmp(&a.balance));
        Ok(savings)
    }

    pub(crate) async fn get_savings(&self, group_id: &str) -> Result<Option<SavingsRecord>> {
        let mut conn = self.pool.acquire().await?;
        get_savings(&mut conn, group_id).await
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &DepositFilter) {
    if let Some(group_id) = &filter.group_id {
        query.push(" AND group_id = ").push_bind(group_id.clone());
    }
    if let Some(start) = filter.start {
        query.push(" AND date >= ").push_bind(date(start));
    }
    if let Some(end) = filter.end {
        query.push(" AND date <= ").push_bind(date(end));
    }
}

fn push_limit(query: &mut QueryBuilder<'_, Sqlite>, filter: &DepositFilter) {
    if let Some(limit) = filter.limit {
        query.push(" LIMIT ").push_bind(i64::from(limit));
    }
}

pub(super) async fn insert_deposit(conn: &mut SqliteConnection, d: &WasteDeposit) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO deposits ({DEPOSIT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&d.id)
    .bind(&d.group_id)
    .bind(&d.waste_type_id)
    .bind(d.weight_kg.to_plain_string())
    .bind(d.price_per_kg.to_plain_string())
    .bind(d.value.to_plain_string())
    .bind(date(d.date))
    .bind(&d.notes)
    .bind(&d.recorded_by)
    .bind(ts(&d.created_at))
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Unable to insert deposit {}", d.id))?;
    Ok(())
}

pub(super) async fn insert_transaction(conn: &mut SqliteConnection, t: &Transaction) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO transactions ({TRANSACTION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&t.id)
    .bind(&t.group_id)
    .bind(t.kind.to_string())
    .bind(t.amount.to_plain_string())
    .bind(t.balance_after.to_plain_string())
    .bind(&t.description)
    .bind(&t.deposit_id)
    .bind(date(t.date))
    .bind(&t.recorded_by)
    .bind(ts(&t.created_at))
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Unable to insert transaction {}", t.id))?;
    Ok(())
}

pub(super) async fn upsert_savings(conn: &mut SqliteConnection, s: &SavingsRecord) -> Result<()> {
    let count = i64::try_from(s.transaction_count).context("Transaction count overflow")?;
    sqlx::query(&format!(
        "INSERT INTO savings ({SAVINGS_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?) \
        ON CONFLICT (group_id) DO UPDATE SET balance = excluded.balance, \
        total_deposits = excluded.total_deposits, total_withdrawals = excluded.total_withdrawals, \
        transaction_count = excluded.transaction_count, \
        last_transaction = excluded.last_transaction"
    ))
    .bind(&s.group_id)
    .bind(s.balance.to_plain_string())
    .bind(s.total_deposits.to_plain_string())
    .bind(s.total_withdrawals.to_plain_string())
    .bind(count)
    .bind(date(s.last_transaction))
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Unable to save savings of group {}", s.group_id))?;
    Ok(())
}

async fn get_savings(conn: &mut SqliteConnection, group_id: &str) -> Result<Option<SavingsRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {SAVINGS_COLUMNS} FROM savings WHERE group_id = ?"
    ))
    .bind(group_id)
    .fetch_optional(&mut *conn)
    .await
    .context("Unable to query savings")?;
    row.as_ref().map(savings_from_row).transpose()
}

pub(super) async fn all_deposits(conn: &mut SqliteConnection) -> Result<Vec<WasteDeposit>> {
    let rows = sqlx::query(&format!(
        "SELECT {DEPOSIT_COLUMNS} FROM deposits ORDER BY rowid"
    ))
    .fetch_all(&mut *conn)
    .await
    .context("Unable to read deposits")?;
    rows.iter().map(deposit_from_row).collect()
}

pub(super) async fn all_transactions(conn: &mut SqliteConnection) -> Result<Vec<Transaction>> {
    let rows = sqlx::query(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY rowid"
    ))
    .fetch_all(&mut *conn)
    .await
    .context("Unable to read transactions")?;
    rows.iter().map(transaction_from_row).collect()
}

pub(super) async fn all_savings(conn: &mut SqliteConnection) -> Result<Vec<SavingsRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {SAVINGS_COLUMNS} FROM savings ORDER BY rowid"
    ))
    .fetch_all(&mut *conn)
    .await
    .context("Unable to read savings")?;
    rows.iter().map(savings_from_row).collect()
}

fn deposit_from_row(row: &SqliteRow) -> Result<WasteDeposit> {
    let weight: String = row.try_get("weight_kg")?;
    let price: String = row.try_get("price_per_kg")?;
    let value: String = row.try_get("value")?;
    let d: String = row.try_get("date")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(WasteDeposit {
        id: row.try_get("id")?,
        group_id: row.try_get("group_id")?,
        waste_type_id: row.try_get("waste_type_id")?,
        weight_kg: parse_weight(&weight)?,
        price_per_kg: parse_amount(&price)?,
        value: parse_amount(&value)?,
        date: parse_date(&d)?,
        notes: row.try_get("notes")?,
        recorded_by: row.try_get("recorded_by")?,
        created_at: parse_ts(&created_at)?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction> {
    let kind: String = row.try_get("kind")?;
    let amount: String = row.try_get("amount")?;
    let balance_after: String = row.try_get("balance_after")?;
    let d: String = row.try_get("date")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Transaction {
        id: row.try_get("id")?,
        group_id: row.try_get("group_id")?,
        kind: TransactionKind::from_str(&kind)
            .with_context(|| format!("Invalid transaction kind '{kind}' in database"))?,
        amount: parse_amount(&amount)?,
        balance_after: parse_amount(&balance_after)?,
        description: row.try_get("description")?,
        deposit_id: row.try_get("deposit_id")?,
        date: parse_date(&d)?,
        recorded_by: row.try_get("recorded_by")?,
        created_at: parse_ts(&created_at)?,
    })
}

fn savings_from_row(row: &SqliteRow) -> Result<SavingsRecord> {
    let balance: String = row.try_get("balance")?;
    let deposits: String = row.try_get("total_deposits")?;
    let withdrawals: String = row.try_get("total_withdrawals")?;
    let count: i64 = row.try_get("transaction_count")?;
    let last: String = row.try_get("last_transaction")?;
    Ok(SavingsRecord {
        group_id: row.try_get("group_id")?,
        balance: parse_amount(&balance)?,
        total_deposits: parse_amount(&deposits)?,
        total_withdrawals: parse_amount(&withdrawals)?,
        transaction_count: u64::try_from(count).context("Invalid transaction count in database")?,
        last_transaction: parse_date(&last)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use crate::ErrorType;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn deposit(group_id: &str, waste: &str, kg: i64, d: &str) -> NewDeposit {
        NewDeposit {
            group_id: group_id.to_string(),
            waste_type_id: waste.to_string(),
            weight: Weight::kg(kg),
            date: day(d),
            notes: String::new(),
            recorded_by: None,
        }
    }

    fn withdrawal(group_id: &str, amount: i64, d: &str) -> NewWithdrawal {
        NewWithdrawal {
            group_id: group_id.to_string(),
            amount: Amount::rupiah(amount),
            date: day(d),
            description: String::new(),
            recorded_by: None,
        }
    }

    #[tokio::test]
    async fn test_plastic_deposit_credits_savings() {
        let env = TestEnv::new().await;
        let g = env.add_group("RT 01").await;
        let db = env.config().db();
        let receipt = db
            .record_deposit(deposit(&g.id, "plastik", 10, "2025-03-01"))
            .await
            .unwrap();
        assert_eq!(receipt.deposit.value, Amount::rupiah(50_000));
        assert_eq!(receipt.transaction.kind, TransactionKind::Deposit);
        assert_eq!(receipt.transaction.amount, Amount::rupiah(50_000));
        assert_eq!(
            receipt.transaction.deposit_id.as_deref(),
            Some(receipt.deposit.id.as_str())
        );
        assert_eq!(receipt.savings.balance, Amount::rupiah(50_000));
        assert_eq!(receipt.savings.transaction_count, 1);

        let filter = DepositFilter::default();
        assert_eq!(db.list_deposits(&filter).await.unwrap(), vec![receipt.deposit]);
        assert_eq!(
            db.list_transactions(&filter).await.unwrap(),
            vec![receipt.transaction]
        );
        assert_eq!(db.get_savings(&g.id).await.unwrap(), Some(receipt.savings));
    }

    #[tokio::test]
    async fn test_balance_is_deposits_minus_withdrawals() {
        let env = TestEnv::new().await;
        let g = env.add_group("RT 02").await;
        let db = env.config().db();
        db.record_deposit(deposit(&g.id, "plastik", 10, "2025-03-01"))
            .await
            .unwrap();
        db.record_deposit(deposit(&g.id, "logam", 2, "2025-03-02"))
            .await
            .unwrap();
        db.withdraw(withdrawal(&g.id, 20_000, "2025-03-03"))
            .await
            .unwrap();
        let receipt = db
            .withdraw(withdrawal(&g.id, 5_000, "2025-03-04"))
            .await
            .unwrap();
        let s = receipt.savings;
        assert_eq!(s.total_deposits, Amount::rupiah(66_000));
        assert_eq!(s.total_withdrawals, Amount::rupiah(25_000));
        assert_eq!(s.balance, Amount::rupiah(41_000));
        assert_eq!(s.transaction_count, 4);
        assert_eq!(receipt.transaction.balance_after, Amount::rupiah(41_000));
        assert!(s.is_consistent());
    }

    #[tokio::test]
    async fn test_withdrawal_over_balance_rejected() {
        let env = TestEnv::new().await;
        let g = env.add_group("RT 03").await;
        let db = env.config().db();
        let err = db
            .withdraw(withdrawal(&g.id, 1, "2025-03-01"))
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
        assert!(err.to_string().contains("Insufficient balance"));

        db.record_deposit(deposit(&g.id, "kaca", 5, "2025-03-01"))
            .await
            .unwrap();
        let err = db
            .withdraw(withdrawal(&g.id, 10_001, "2025-03-02"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Insufficient balance"));
        assert_eq!(
            db.get_savings(&g.id).await.unwrap().unwrap().balance,
            Amount::rupiah(10_000)
        );
        assert_eq!(
            db.list_transactions(&DepositFilter::default())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_invalid_deposits_rejected() {
        let env = TestEnv::new().await;
        let g = env.add_group("RT 04").await;
        let db = env.config().db();
        for bad in [
            deposit(&g.id, "plastik", 0, "2025-03-01"),
            deposit(&g.id, "besi", 1, "2025-03-01"),
            deposit("no-such-group", "plastik", 1, "2025-03-01"),
        ] {
            let err = db.record_deposit(bad).await.unwrap_err();
            assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
        }
        assert!(db
            .withdraw(withdrawal(&g.id, 0, "2025-03-01"))
            .await
            .is_err());
        assert!(db.list_deposits(&DepositFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_deposits_rejected() {
        let env = TestEnv::new().await;
        let g = env.add_group("RT 04").await;
        let db = env.config().db();
        let huge = |kg: rust_decimal::Decimal| NewDeposit {
            weight: Weight::new(kg),
            ..deposit(&g.id, "plastik", 1, "2025-03-01")
        };

        let err = db
            .record_deposit(huge(rust_decimal::Decimal::MAX))
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));

        // each value fits on its own but the balance cannot hold both
        let half = rust_decimal::Decimal::MAX / rust_decimal::Decimal::from(10_000);
        let first = db.record_deposit(huge(half)).await.unwrap();
        let most = rust_decimal::Decimal::MAX / rust_decimal::Decimal::from(6_000);
        let err = db.record_deposit(huge(most)).await.unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));

        let savings = db.list_savings().await.unwrap();
        assert_eq!(savings, vec![first.savings]);
        let deposits = db.list_deposits(&DepositFilter::default()).await.unwrap();
        assert_eq!(deposits.len(), 1);
    }

    #[tokio::test]
    async fn test_filters_and_ordering() {
        let env = TestEnv::new().await;
        let a = env.add_group("RT 05").await;
        let b = env.add_group("RT 06").await;
        let db = env.config().db();
        db.record_deposit(deposit(&a.id, "kertas", 1, "2025-03-01"))
            .await
            .unwrap();
        db.record_deposit(deposit(&b.id, "kertas", 2, "2025-03-05"))
            .await
            .unwrap();
        db.record_deposit(deposit(&a.id, "kertas", 3, "2025-03-10"))
            .await
            .unwrap();

        let all = db.list_deposits(&DepositFilter::default()).await.unwrap();
        let weights: Vec<Weight> = all.iter().map(|d| d.weight_kg).collect();
        assert_eq!(weights, vec![Weight::kg(3), Weight::kg(2), Weight::kg(1)]);

        let only_a = DepositFilter {
            group_id: Some(a.id.clone()),
            start: Some(day("2025-03-02")),
            ..Default::default()
        };
        let found = db.list_deposits(&only_a).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].weight_kg, Weight::kg(3));

        let latest = DepositFilter {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(db.list_transactions(&latest).await.unwrap().len(), 1);

        let savings = db.list_savings().await.unwrap();
        assert_eq!(savings[0].group_id, a.id);
    }

    #[tokio::test]
    async fn test_price_change_does_not_touch_past_deposits() {
        let env = TestEnv::new().await;
        let g = env.add_group("RT 07").await;
        let db = env.config().db();
        db.record_deposit(deposit(&g.id, "plastik", 1, "2025-03-01"))
            .await
            .unwrap();
        db.set_price("plastik", Amount::rupiah(6_000)).await.unwrap();
        let deposits = db.list_deposits(&DepositFilter::default()).await.unwrap();
        assert_eq!(deposits[0].price_per_kg, Amount::rupiah(5_000));
        assert_eq!(deposits[0].value, Amount::rupiah(5_000));
        assert!(db.delete_price("plastik").await.is_err());
    }
}
