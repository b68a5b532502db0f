//! Report, dashboard and statistics command handlers.

use crate::args::{DashboardArgs, ReportArgs};
use crate::commands::{plural, Out, OutputFormat, Rows};
use crate::error::{ErrorType, IntoResult};
use crate::report::month_range;
use crate::{auth, export, utils, Config, Dashboard, Report, Result, SystemStats};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the period report is written.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown tables.
    #[default]
    Table,
    /// One JSON document.
    Json,
    /// One CSV file per sheet: summary, ranking, waste types and daily trend.
    Csv,
}

serde_plain::derive_display_from_serialize!(ReportFormat);
serde_plain::derive_fromstr_from_deserialize!(ReportFormat);

/// Produces the period report. The period defaults to the current month.
pub async fn report(config: Config, args: ReportArgs) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let (start, end, as_of) = period(&args, utils::today());
    let data = config
        .db()
        .snapshot()
        .await
        .pub_result(ErrorType::Database)?;
    let report = Report::compute(&data, start, end, as_of).pub_result(ErrorType::Request)?;
    let headline = format!(
        "Report {} to {}: {} worth {} from {} active group(s)",
        report.start,
        report.end,
        report.summary.total_weight,
        report.summary.total_value,
        report.summary.active_groups
    );

    let rendered = match args.format() {
        ReportFormat::Csv => {
            let dir = args.out().ok_or_else(|| {
                crate::Error::request("The csv report format needs --out <DIRECTORY>")
            })?;
            let paths = export::write_report_sheets(&report, dir)
                .await
                .pub_result(ErrorType::Request)?;
            debug!("Wrote {} report sheets", paths.len());
            return Ok(Out::new_message(format!(
                "{headline}. Sheets written to {}",
                dir.display()
            )));
        }
        ReportFormat::Json => Rows::Json(
            serde_json::to_value(&report).context("Unable to serialize the report")?,
        ),
        ReportFormat::Table => Rows::Table(report.markdown()),
    };
    match args.out() {
        Some(path) => {
            utils::write(path, rendered.to_string())
                .await
                .pub_result(ErrorType::Request)?;
            Ok(Out::new_message(format!(
                "{headline}. Written to {}",
                path.display()
            )))
        }
        None => Ok(Out::new(headline, rendered)),
    }
}

/// The report period and trend end, filling in defaults relative to `today`.
fn period(args: &ReportArgs, today: NaiveDate) -> (NaiveDate, NaiveDate, NaiveDate) {
    let (month_start, month_end) = month_range(args.start().unwrap_or(today));
    let start = args.start().unwrap_or(month_start);
    let end = args.end().unwrap_or(month_end);
    let as_of = args.as_of().unwrap_or_else(|| end.min(today));
    (start, end, as_of)
}

/// Shows the dashboard for a day (default today).
pub async fn dashboard(config: Config, args: DashboardArgs) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let data = config
        .db()
        .snapshot()
        .await
        .pub_result(ErrorType::Database)?;
    let dashboard = Dashboard::compute(&data, args.as_of().unwrap_or_else(utils::today));
    let headline = format!(
        "{}, {} in savings, {} deposited on {}",
        plural(dashboard.total_groups as usize, "group"),
        dashboard.total_balance,
        dashboard.weight_today,
        dashboard.as_of
    );
    let rows = match args.format() {
        OutputFormat::Table => Rows::Table(dashboard.markdown()),
        format => Rows::render(format, &dashboard, &["Metric", "Value"], figures(&dashboard))?,
    };
    Ok(Out::new(headline, rows))
}

fn figures(d: &Dashboard) -> Vec<Vec<String>> {
    vec![
        vec!["date".to_string(), d.as_of.to_string()],
        vec!["total_groups".to_string(), d.total_groups.to_string()],
        vec!["weight_today_kg".to_string(), d.weight_today.to_plain_string()],
        vec!["total_balance".to_string(), d.total_balance.to_plain_string()],
        vec![
            "transactions_this_month".to_string(),
            d.transactions_this_month.to_string(),
        ],
    ]
}

/// Shows the number of groups and records and the size of the database file.
pub async fn stats(config: Config, format: OutputFormat) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let (groups, records) = config
        .db()
        .record_counts()
        .await
        .pub_result(ErrorType::Database)?;
    let database_bytes = utils::file_size(config.sqlite_path())
        .await
        .pub_result(ErrorType::Database)?;
    let stats = SystemStats {
        groups: u64::try_from(groups).unwrap_or_default(),
        records: u64::try_from(records).unwrap_or_default(),
        database_bytes,
    };
    let size = format_num::format_num!(",.0", stats.database_bytes as f64);
    let cells = vec![
        vec!["Groups".to_string(), stats.groups.to_string()],
        vec!["Records".to_string(), stats.records.to_string()],
        vec!["Database size (bytes)".to_string(), size.clone()],
    ];
    let rows = Rows::render(format, &stats, &["Statistic", "Value"], cells)?;
    Ok(Out::new(
        format!(
            "{}, {}, database is {size} bytes",
            plural(stats.groups as usize, "group"),
            plural(stats.records as usize, "record")
        ),
        rows,
    ))
}
