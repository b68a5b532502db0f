//! Aggregates computed from a snapshot of the records: the period report, the dashboard and the
//! system statistics. Nothing here is stored; every figure is recomputed on request.

use crate::model::{Amount, BankData, Transaction, TransactionKind, Weight};
use crate::{utils, Error, Result};
use anyhow::Context;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Number of days covered by the daily trend.
pub const TREND_DAYS: u64 = 7;

/// Number of entries in each dashboard list.
pub const DASHBOARD_ENTRIES: usize = 5;

/// Headline figures for a period.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_weight: Weight,
    pub total_value: Amount,
    /// Groups with at least one deposit in the period.
    pub active_groups: u64,
    /// Deposit and withdrawal transactions dated in the period.
    pub transactions: u64,
    pub average_weight_per_group: Weight,
    /// Percent change of total weight against the preceding period of the same length. `None`
    /// when nothing was deposited in the preceding period.
    pub growth_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WasteTypeShare {
    pub waste_type_id: String,
    pub name: String,
    pub weight: Weight,
    pub value: Amount,
    /// Share of the period's total weight, in percent with one decimal.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupRank {
    pub rank: u32,
    pub group_id: String,
    pub name: String,
    pub weight: Weight,
    pub value: Amount,
    pub deposits: u64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub weight: Weight,
    pub value: Amount,
}

/// The period report.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// The last day of the daily trend.
    pub as_of: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub rw_name: String,
    pub summary: Summary,
    pub waste_types: Vec<WasteTypeShare>,
    pub ranking: Vec<GroupRank>,
    pub daily_trend: Vec<DailyTotal>,
}

impl Report {
    /// Computes the report for the inclusive range `start..=end`.
    pub fn compute(data: &BankData, start: NaiveDate, end: NaiveDate, as_of: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::request(format!(
                "The report start {start} is after its end {end}"
            ))
            .into());
        }
        let in_period: Vec<_> = data
            .waste_deposits
            .iter()
            .filter(|d| d.date >= start && d.date <= end)
            .collect();

        let total_weight: Weight = in_period.iter().map(|d| d.weight_kg).sum();
        let total_value: Amount = in_period.iter().map(|d| d.value).sum();
        let active: HashSet<&str> = in_period.iter().map(|d| d.group_id.as_str()).collect();
        let active_groups = active.len() as u64;
        let transactions = data
            .transactions
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
            .count() as u64;
        let average_weight_per_group = if active_groups == 0 {
            Weight::ZERO
        } else {
            Weight::new((total_weight.value() / Decimal::from(active_groups)).round_dp(2))
        };

        let summary = Summary {
            total_weight,
            total_value,
            active_groups,
            transactions,
            average_weight_per_group,
            growth_percent: growth(data, start, end, total_weight)?,
        };

        // waste type distribution
        let mut by_type: HashMap<&str, (Weight, Amount)> = HashMap::new();
        for d in &in_period {
            let entry = by_type
                .entry(d.waste_type_id.as_str())
                .or_insert((Weight::ZERO, Amount::ZERO));
            entry.0 += d.weight_kg;
            entry.1 += d.value;
        }
        let mut waste_types: Vec<WasteTypeShare> = by_type
            .into_iter()
            .map(|(id, (weight, value))| WasteTypeShare {
                waste_type_id: id.to_string(),
                name: data.waste_name(id).to_string(),
                weight,
                value,
                percentage: percent(weight.value(), total_weight.value()),
            })
            .collect();
        waste_types.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.name.cmp(&b.name)));

        // group ranking
        let mut by_group: HashMap<&str, (Weight, Amount, u64)> = HashMap::new();
        for d in &in_period {
            let entry = by_group
                .entry(d.group_id.as_str())
                .or_insert((Weight::ZERO, Amount::ZERO, 0));
            entry.0 += d.weight_kg;
            entry.1 += d.value;
            entry.2 += 1;
        }
        let mut ranking: Vec<GroupRank> = by_group
            .into_iter()
            .map(|(id, (weight, value, deposits))| GroupRank {
                rank: 0,
                group_id: id.to_string(),
                name: data.group_name(id).to_string(),
                weight,
                value,
                deposits,
            })
            .collect();
        ranking.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.name.cmp(&b.name)));
        for (i, r) in ranking.iter_mut().enumerate() {
            r.rank = u32::try_from(i + 1).context("Too many groups to rank")?;
        }

        Ok(Self {
            start,
            end,
            as_of,
            generated_at: utils::now(),
            rw_name: data.app_settings.rw_name.clone(),
            summary,
            waste_types,
            ranking,
            daily_trend: daily_trend(data, as_of)?,
        })
    }

    /// The report as markdown tables.
    pub fn markdown(&self) -> String {
        let mut out = String::new();
        let title = if self.rw_name.is_empty() {
            String::from("Waste bank report")
        } else {
            format!("Waste bank report, {}", self.rw_name)
        };
        out.push_str(&format!("# {title}\n\nPeriod: {} to {}\n\n", self.start, self.end));
        out.push_str(&utils::markdown_table(&["Metric", "Value"], self.summary_rows()));
        out.push_str("\n## Group ranking\n\n");
        out.push_str(&utils::markdown_table(
            &RANKING_HEADERS,
            self.ranking.iter().map(|r| {
                vec![
                    r.rank.to_string(),
                    r.name.clone(),
                    r.weight.to_string(),
                    r.value.to_string(),
                    r.deposits.to_string(),
                ]
            }),
        ));
        out.push_str("\n## Waste types\n\n");
        out.push_str(&utils::markdown_table(
            &WASTE_TYPE_HEADERS,
            self.waste_types.iter().map(|w| {
                vec![
                    w.name.clone(),
                    w.weight.to_string(),
                    w.value.to_string(),
                    format!("{}%", w.percentage),
                ]
            }),
        ));
        out.push_str(&format!("\n## Last {TREND_DAYS} days\n\n"));
        out.push_str(&utils::markdown_table(
            &TREND_HEADERS,
            self.daily_trend.iter().map(|d| {
                vec![d.date.to_string(), d.weight.to_string(), d.value.to_string()]
            }),
        ));
        out
    }

    /// The summary as (metric, value) rows.
    pub fn summary_rows(&self) -> Vec<Vec<String>> {
        let s = &self.summary;
        vec![
            vec!["Total weight".to_string(), s.total_weight.to_string()],
            vec!["Total value".to_string(), s.total_value.to_string()],
            vec!["Active groups".to_string(), s.active_groups.to_string()],
            vec!["Transactions".to_string(), s.transactions.to_string()],
            vec![
                "Average per group".to_string(),
                s.average_weight_per_group.to_string(),
            ],
            vec![
                "Growth".to_string(),
                s.growth_percent
                    .map(|g| format!("{g}%"))
                    .unwrap_or_else(|| String::from("n/a")),
            ],
        ]
    }
}

pub(crate) const RANKING_HEADERS: [&str; 5] = ["Rank", "Group", "Weight", "Value", "Deposits"];
pub(crate) const WASTE_TYPE_HEADERS: [&str; 4] = ["Waste type", "Weight", "Value", "Share"];
pub(crate) const TREND_HEADERS: [&str; 3] = ["Date", "Weight", "Value"];

/// Percent change of deposited weight against the period of equal length just before `start`.
fn growth(data: &BankData, start: NaiveDate, end: NaiveDate, current: Weight) -> Result<Option<Decimal>> {
    let days = u64::try_from((end - start).num_days() + 1).context("Invalid report period")?;
    let Some(prev_start) = start.checked_sub_days(Days::new(days)) else {
        return Ok(None);
    };
    let prev_end = start.pred_opt().context("Report period starts too early")?;
    let previous: Weight = data
        .waste_deposits
        .iter()
        .filter(|d| d.date >= prev_start && d.date <= prev_end)
        .map(|d| d.weight_kg)
        .sum();
    if previous.value().is_zero() {
        return Ok(None);
    }
    let change = (current.value() - previous.value()) / previous.value() * Decimal::ONE_HUNDRED;
    Ok(Some(change.round_dp(1)))
}

/// Deposited weight and value for each of the `TREND_DAYS` days ending at `as_of`, oldest first.
fn daily_trend(data: &BankData, as_of: NaiveDate) -> Result<Vec<DailyTotal>> {
    let first = as_of
        .checked_sub_days(Days::new(TREND_DAYS - 1))
        .context("Trend date out of range")?;
    let mut days: BTreeMap<NaiveDate, (Weight, Amount)> = first
        .iter_days()
        .take(TREND_DAYS as usize)
        .map(|d| (d, (Weight::ZERO, Amount::ZERO)))
        .collect();
    for d in &data.waste_deposits {
        if let Some(entry) = days.get_mut(&d.date) {
            entry.0 += d.weight_kg;
            entry.1 += d.value;
        }
    }
    Ok(days
        .into_iter()
        .map(|(date, (weight, value))| DailyTotal {
            date,
            weight,
            value,
        })
        .collect())
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED).round_dp(1)
}

/// The first and last day of the month containing `date`.
pub fn month_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date);
    (first, last)
}

/// A transaction as shown on the dashboard.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RecentTransaction {
    pub date: NaiveDate,
    pub group: String,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub description: String,
}

/// A savings balance as shown on the dashboard.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SavingsLine {
    pub group_id: String,
    pub group: String,
    pub balance: Amount,
    pub last_transaction: NaiveDate,
}

/// Figures for the start screen.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub as_of: NaiveDate,
    pub total_groups: u64,
    /// Weight deposited on `as_of`.
    pub weight_today: Weight,
    pub total_balance: Amount,
    /// Transactions dated in the month of `as_of`.
    pub transactions_this_month: u64,
    pub recent_transactions: Vec<RecentTransaction>,
    /// Largest balances first.
    pub top_savings: Vec<SavingsLine>,
}

impl Dashboard {
    pub fn compute(data: &BankData, as_of: NaiveDate) -> Self {
        let (month_start, month_end) = month_range(as_of);
        let mut recent: Vec<&Transaction> = data.transactions.iter().collect();
        recent.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        let mut savings: Vec<_> = data.savings.iter().collect();
        savings.sort_by(|a, b| {
            b.balance
                .cmp(&a.balance)
                .then_with(|| data.group_name(&a.group_id).cmp(data.group_name(&b.group_id)))
        });
        Self {
            as_of,
            total_groups: data.groups.len() as u64,
            weight_today: data
                .waste_deposits
                .iter()
                .filter(|d| d.date == as_of)
                .map(|d| d.weight_kg)
                .sum(),
            total_balance: data.savings.iter().map(|s| s.balance).sum(),
            transactions_this_month: data
                .transactions
                .iter()
                .filter(|t| t.date >= month_start && t.date <= month_end)
                .count() as u64,
            recent_transactions: recent
                .into_iter()
                .take(DASHBOARD_ENTRIES)
                .map(|t| RecentTransaction {
                    date: t.date,
                    group: data.group_name(&t.group_id).to_string(),
                    kind: t.kind,
                    amount: t.amount,
                    description: t.description.clone(),
                })
                .collect(),
            top_savings: savings
                .into_iter()
                .take(DASHBOARD_ENTRIES)
                .map(|s| SavingsLine {
                    group_id: s.group_id.clone(),
                    group: data.group_name(&s.group_id).to_string(),
                    balance: s.balance,
                    last_transaction: s.last_transaction,
                })
                .collect(),
        }
    }

    pub fn markdown(&self) -> String {
        let mut out = format!("# Dashboard {}\n\n", self.as_of);
        out.push_str(&utils::markdown_table(
            &["Metric", "Value"],
            vec![
                vec!["Groups".to_string(), self.total_groups.to_string()],
                vec!["Deposited today".to_string(), self.weight_today.to_string()],
                vec!["Total balance".to_string(), self.total_balance.to_string()],
                vec![
                    "Transactions this month".to_string(),
                    self.transactions_this_month.to_string(),
                ],
            ],
        ));
        out.push_str("\n## Recent transactions\n\n");
        out.push_str(&utils::markdown_table(
            &["Date", "Group", "Kind", "Amount", "Description"],
            self.recent_transactions.iter().map(|t| {
                vec![
                    t.date.to_string(),
                    t.group.clone(),
                    t.kind.to_string(),
                    t.amount.to_string(),
                    t.description.clone(),
                ]
            }),
        ));
        out.push_str("\n## Top savings\n\n");
        out.push_str(&utils::markdown_table(
            &["Group", "Balance", "Last transaction"],
            self.top_savings.iter().map(|s| {
                vec![
                    s.group.clone(),
                    s.balance.to_string(),
                    s.last_transaction.to_string(),
                ]
            }),
        ));
        out
    }
}

/// Size figures for the data directory.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub groups: u64,
    /// Deposits plus transactions.
    pub records: u64,
    pub database_bytes: u64,
}
