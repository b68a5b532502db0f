//! Command handlers for the banksampah CLI.
//!
//! This module contains implementations for all CLI subcommands. Every handler resolves the acting
//! user from the session first, so a missing or expired login fails before anything is read.

mod backup;
mod deposits;
mod groups;
mod init;
mod prices;
mod report;
mod savings;
mod session;
mod settings;
mod users;

use crate::backup::AUTO;
use crate::{utils, Config, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use tracing::{debug, info};

pub use backup::{backup_create, backup_list, export_csv, export_json, reset, restore};
pub use deposits::{deposit_list, deposit_record};
pub use groups::{group_add, group_delete, group_list, group_update};
pub use init::init;
pub use prices::{price_add, price_list, price_remove, price_set};
pub use report::{dashboard, report, stats, ReportFormat};
pub use savings::{savings_audit, savings_history, savings_list, withdraw};
pub use session::{login, logout, whoami};
pub use settings::{settings_set, settings_show};
pub use users::{user_add, user_delete, user_list, user_update};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

impl Out<Rows> {
    /// Print the message to `info!` and the rows to stdout so that they can be piped.
    pub fn print_rows(&self) {
        info!("{}", self.message);
        if let Some(rows) = self.structure() {
            println!("{rows}");
        }
    }
}

/// How listings are rendered.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A markdown table.
    #[default]
    Table,
    /// A JSON array of objects.
    Json,
    /// CSV with a header row.
    Csv,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

/// Listing rows in the requested output format.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rows {
    /// JSON array of objects where each row is a self-describing object.
    Json(serde_json::Value),
    /// Markdown table as a single formatted string.
    Table(String),
    /// CSV data as a properly escaped string.
    Csv(String),
}

impl Rows {
    /// Renders `items` as JSON, or `cells` under `headers` as a table or CSV.
    pub(crate) fn render<T>(
        format: OutputFormat,
        items: &T,
        headers: &[&str],
        cells: Vec<Vec<String>>,
    ) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(match format {
            OutputFormat::Json => {
                Rows::Json(serde_json::to_value(items).context("Unable to serialize rows")?)
            }
            OutputFormat::Table => Rows::Table(utils::markdown_table(headers, cells)),
            OutputFormat::Csv => {
                let mut w = csv::Writer::from_writer(Vec::new());
                w.write_record(headers)?;
                for row in cells {
                    w.write_record(row)?;
                }
                let bytes = w.into_inner().context("Unable to flush CSV")?;
                Rows::Csv(String::from_utf8(bytes).context("CSV output is not UTF-8")?)
            }
        })
    }
}

impl Debug for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => write!(f, "Rows::Json({:?})", v),
            Rows::Table(s) => write!(f, "Rows::Table({} chars)", s.len()),
            Rows::Csv(s) => write!(f, "Rows::Csv({} chars)", s.len()),
        }
    }
}

impl Display for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => {
                if let Ok(s) = serde_json::to_string_pretty(v) {
                    write!(f, "{}", s)
                } else {
                    write!(f, "{:?}", v)
                }
            }
            Rows::Table(s) => write!(f, "{}", s),
            Rows::Csv(s) => write!(f, "{}", s),
        }
    }
}

/// Saves an `auto` snapshot when the `auto_backup` setting is on. Returns the written path.
pub(crate) async fn auto_backup(config: &Config) -> Result<Option<std::path::PathBuf>> {
    let data = config.db().snapshot().await?;
    if !data.app_settings.auto_backup {
        return Ok(None);
    }
    let path = config.backup().save_json(AUTO, &data).await?;
    debug!("Saved automatic backup to {}", path.display());
    Ok(Some(path))
}

/// "1 group", "2 groups".
pub(crate) fn plural(count: usize, noun: &str) -> String {
    format!("{count} {noun}{}", if count == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Item {
        name: &'static str,
        kg: u32,
    }

    fn rows(format: OutputFormat) -> Rows {
        let items = vec![Item { name: "RT 01", kg: 3 }, Item { name: "RT, 02", kg: 0 }];
        let cells = items
            .iter()
            .map(|i| vec![i.name.to_string(), i.kg.to_string()])
            .collect();
        Rows::render(format, &items, &["Name", "Kg"], cells).unwrap()
    }

    #[test]
    fn test_render_csv() {
        assert_eq!(rows(OutputFormat::Csv).to_string(), "Name,Kg\nRT 01,3\n\"RT, 02\",0\n");
    }

    #[test]
    fn test_render_json() {
        let Rows::Json(value) = rows(OutputFormat::Json) else {
            panic!("expected json rows");
        };
        assert_eq!(value[1]["name"], "RT, 02");
        assert_eq!(value[0]["kg"], 3);
    }

    #[test]
    fn test_render_table() {
        let table = rows(OutputFormat::Table).to_string();
        assert!(table.starts_with("| Name | Kg |"));
        assert!(table.contains("| RT, 02 | 0 |"));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "group"), "1 group");
        assert_eq!(plural(0, "group"), "0 groups");
    }
}
