//! CSV exports of the records and of the period report.

use crate::model::BankData;
use crate::report::Report;
use crate::{utils, Result};
use anyhow::Context;
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which records to export.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Groups,
    Deposits,
    Savings,
    Transactions,
}

serde_plain::derive_display_from_serialize!(ExportKind);

#[derive(Serialize)]
struct GroupRow<'a> {
    id: &'a str,
    name: &'a str,
    leader: &'a str,
    households: Option<u32>,
    address: &'a str,
    balance: String,
    created_at: String,
}

#[derive(Serialize)]
struct DepositRow<'a> {
    date: NaiveDate,
    group: &'a str,
    waste_type: &'a str,
    weight_kg: String,
    price_per_kg: String,
    value: String,
    notes: &'a str,
    id: &'a str,
}

#[derive(Serialize)]
struct SavingsRow<'a> {
    group: &'a str,
    balance: String,
    total_deposits: String,
    total_withdrawals: String,
    transaction_count: u64,
    last_transaction: NaiveDate,
}

#[derive(Serialize)]
struct TransactionRow<'a> {
    date: NaiveDate,
    group: &'a str,
    kind: String,
    amount: String,
    balance_after: String,
    description: &'a str,
    id: &'a str,
}

/// Renders one kind of record as CSV with a header row. Rows are in insertion order.
pub fn records_csv(data: &BankData, kind: ExportKind) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    match kind {
        ExportKind::Groups => {
            for g in &data.groups {
                let balance = data
                    .savings
                    .iter()
                    .find(|s| s.group_id == g.id)
                    .map(|s| s.balance.to_plain_string())
                    .unwrap_or_else(|| String::from("0"));
                w.serialize(GroupRow {
                    id: &g.id,
                    name: &g.name,
                    leader: &g.leader,
                    households: g.households,
                    address: &g.address,
                    balance,
                    created_at: g.created_at.to_rfc3339(),
                })?;
            }
        }
        ExportKind::Deposits => {
            for d in &data.waste_deposits {
                w.serialize(DepositRow {
                    date: d.date,
                    group: data.group_name(&d.group_id),
                    waste_type: data.waste_name(&d.waste_type_id),
                    weight_kg: d.weight_kg.to_plain_string(),
                    price_per_kg: d.price_per_kg.to_plain_string(),
                    value: d.value.to_plain_string(),
                    notes: &d.notes,
                    id: &d.id,
                })?;
            }
        }
        ExportKind::Savings => {
            for s in &data.savings {
                w.serialize(SavingsRow {
                    group: data.group_name(&s.group_id),
                    balance: s.balance.to_plain_string(),
                    total_deposits: s.total_deposits.to_plain_string(),
                    total_withdrawals: s.total_withdrawals.to_plain_string(),
                    transaction_count: s.transaction_count,
                    last_transaction: s.last_transaction,
                })?;
            }
        }
        ExportKind::Transactions => {
            for t in &data.transactions {
                w.serialize(TransactionRow {
                    date: t.date,
                    group: data.group_name(&t.group_id),
                    kind: t.kind.to_string(),
                    amount: t.amount.to_plain_string(),
                    balance_after: t.balance_after.to_plain_string(),
                    description: &t.description,
                    id: &t.id,
                })?;
            }
        }
    }
    finish(w)
}

/// Writes the report as one CSV file per sheet into `dir`, creating it if needed. Returns the
/// written paths in sheet order: summary, ranking, waste types, daily trend.
pub async fn write_report_sheets(report: &Report, dir: &Path) -> Result<Vec<PathBuf>> {
    utils::make_dir(dir).await?;
    let sheets = [
        ("summary.csv", summary_csv(report)?),
        ("ranking.csv", ranking_csv(report)?),
        ("waste_types.csv", waste_types_csv(report)?),
        ("daily_trend.csv", daily_trend_csv(report)?),
    ];
    let mut paths = Vec::with_capacity(sheets.len());
    for (name, content) in sheets {
        let path = dir.join(name);
        utils::write(&path, content).await?;
        paths.push(path);
    }
    Ok(paths)
}

fn summary_csv(report: &Report) -> Result<String> {
    let s = &report.summary;
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["metric", "value"])?;
    let rows = [
        ("period_start", report.start.to_string()),
        ("period_end", report.end.to_string()),
        ("total_weight_kg", s.total_weight.to_plain_string()),
        ("total_value", s.total_value.to_plain_string()),
        ("active_groups", s.active_groups.to_string()),
        ("transactions", s.transactions.to_string()),
        ("average_weight_per_group_kg", s.average_weight_per_group.to_plain_string()),
        (
            "growth_percent",
            s.growth_percent.map(|g| g.to_string()).unwrap_or_default(),
        ),
    ];
    for (metric, value) in rows {
        w.write_record([metric, value.as_str()])?;
    }
    finish(w)
}

fn ranking_csv(report: &Report) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["rank", "group", "weight_kg", "value", "deposits"])?;
    for r in &report.ranking {
        w.write_record([
            r.rank.to_string(),
            r.name.clone(),
            r.weight.to_plain_string(),
            r.value.to_plain_string(),
            r.deposits.to_string(),
        ])?;
    }
    finish(w)
}

fn waste_types_csv(report: &Report) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["waste_type", "weight_kg", "value", "percentage"])?;
    for t in &report.waste_types {
        w.write_record([
            t.name.clone(),
            t.weight.to_plain_string(),
            t.value.to_plain_string(),
            t.percentage.to_string(),
        ])?;
    }
    finish(w)
}

fn daily_trend_csv(report: &Report) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["date", "weight_kg", "value"])?;
    for d in &report.daily_trend {
        w.write_record([
            d.date.to_string(),
            d.weight.to_plain_string(),
            d.value.to_plain_string(),
        ])?;
    }
    finish(w)
}

fn finish(w: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = w.into_inner().context("Unable to flush CSV")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}
