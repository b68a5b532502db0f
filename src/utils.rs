use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs::ReadDir;

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .context(format!("Unable to write to {}", path.to_string_lossy()))
}

/// Read a file to a `String`.
pub async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Deserialize a JSON file into type `T`.
pub async fn deserialize<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = read(path).await?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file at {}", path.display()))
}

/// Create a directory and all of its parents.
pub(crate) async fn make_dir(p: impl AsRef<Path>) -> Result<()> {
    let p = p.as_ref();
    tokio::fs::create_dir_all(p)
        .await
        .with_context(|| format!("Unable to create directory at {}", p.to_string_lossy()))
}

pub(crate) async fn canonicalize(p: impl AsRef<Path>) -> Result<PathBuf> {
    let p = p.as_ref();
    tokio::fs::canonicalize(p)
        .await
        .with_context(|| format!("Unable to canonicalize the path {}", p.to_string_lossy()))
}

pub(crate) async fn read_dir(p: impl AsRef<Path>) -> Result<ReadDir> {
    let p = p.as_ref();
    tokio::fs::read_dir(p)
        .await
        .with_context(|| format!("Unable to read directory {}", p.to_string_lossy()))
}

pub(crate) async fn remove(p: impl AsRef<Path>) -> Result<()> {
    let p = p.as_ref();
    tokio::fs::remove_file(p)
        .await
        .with_context(|| format!("Unable to remove file {}", p.to_string_lossy()))
}

/// Returns the size of a file in bytes.
pub(crate) async fn file_size(p: impl AsRef<Path>) -> Result<u64> {
    let p = p.as_ref();
    let meta = tokio::fs::metadata(p)
        .await
        .with_context(|| format!("Unable to stat file {}", p.to_string_lossy()))?;
    Ok(meta.len())
}

/// Generates a new random identifier for a record.
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Today's date in the local timezone.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The current time, truncated to microseconds so that it survives storage unchanged.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Renders a markdown table. Cells containing `|` are escaped.
pub(crate) fn markdown_table<H, R, C>(headers: &[H], rows: R) -> String
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<C>>,
    C: AsRef<str>,
{
    let escape = |s: &str| s.replace('|', "\\|");
    let mut out = String::new();
    out.push_str("| ");
    out.push_str(
        &headers
            .iter()
            .map(|h| escape(h.as_ref()))
            .collect::<Vec<_>>()
            .join(" | "),
    );
    out.push_str(" |\n|");
    for _ in headers {
        out.push_str(" --- |");
    }
    out.push('\n');
    for row in rows {
        out.push_str("| ");
        out.push_str(
            &row.iter()
                .map(|c| escape(c.as_ref()))
                .collect::<Vec<_>>()
                .join(" | "),
        );
        out.push_str(" |\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_table() {
        let table = markdown_table(
            &["Name", "Balance"],
            vec![vec!["RT 01", "Rp50.000"], vec!["a|b", "Rp0"]],
        );
        let expected = "| Name | Balance |\n| --- | --- |\n| RT 01 | Rp50.000 |\n| a\\|b | Rp0 |\n";
        assert_eq!(table, expected);
    }

    #[test]
    fn test_generate_id_unique() {
        assert_ne!(generate_id(), generate_id());
    }

    #[tokio::test]
    async fn test_write_read_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        write(&path, "hello").await.unwrap();
        assert_eq!(read(&path).await.unwrap(), "hello");
        assert_eq!(file_size(&path).await.unwrap(), 5);
        remove(&path).await.unwrap();
        assert!(!path.exists());
    }
}
