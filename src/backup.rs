//! Backup files: rotating JSON snapshots of the bookkeeping records and copies of the database.

use crate::model::BankData;
use crate::{utils, Config, Error, Result};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for backups requested by a user.
pub const BACKUP: &str = "backup";

/// Prefix for backups saved after each deposit and withdrawal when `auto_backup` is on.
pub const AUTO: &str = "auto";

/// Prefix for the snapshot taken before a restore replaces the data.
pub const PRE_RESTORE: &str = "pre-restore";

/// Prefix for the snapshot taken before a reset erases the data.
pub const PRE_RESET: &str = "pre-reset";

/// Prefix for SQLite database copies.
pub const SQLITE: &str = "banksampah.sqlite";

/// The version of the backup file layout written by this program.
pub const FORMAT_VERSION: u32 = 1;

/// The content of a JSON backup file.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: BankData,
}

impl BackupFile {
    pub fn new(data: BankData) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            exported_at: utils::now(),
            data,
        }
    }

    /// Parses backup JSON. Anything that is not a backup this program can read is a `Backup`
    /// error whose message starts with "Invalid backup file".
    pub fn parse(json: &str) -> Result<Self> {
        let file: BackupFile = serde_json::from_str(json)
            .map_err(|e| Error::backup(format!("Invalid backup file: {e}")))?;
        if file.format_version == 0 || file.format_version > FORMAT_VERSION {
            return Err(Error::backup(format!(
                "Invalid backup file: unsupported format version {}",
                file.format_version
            ))
            .into());
        }
        Ok(file)
    }

    /// Reads and parses the backup file at `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let json = utils::read(path).await?;
        Self::parse(&json).with_context(|| format!("Unable to restore from {}", path.display()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize backup to JSON")
    }
}

/// A file in the backups directory.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Manages backup file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    /// Creates a new `Backup` instance from a `Config`.
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
        }
    }

    /// Saves `data` as a pretty-printed JSON backup file.
    ///
    /// The filename format is `{prefix}.YYYY-MM-DD-NNN.json` where NNN is a sequence number.
    /// Automatically rotates old backups, keeping only `backup_copies` files per prefix.
    ///
    /// Returns the path to the created backup file.
    pub async fn save_json(&self, prefix: &str, data: &BankData) -> Result<PathBuf> {
        let path = self.next_path(prefix, "json").await?;
        let json = BackupFile::new(data.clone()).to_json()?;
        utils::write(&path, json).await?;
        self.rotate(prefix, "json").await?;
        Ok(path)
    }

    /// Copies the SQLite database to the backups directory with the filename format
    /// `banksampah.sqlite.YYYY-MM-DD-NNN`, rotating old copies.
    pub(crate) async fn copy_sqlite(&self, config: &Config) -> Result<PathBuf> {
        let path = self.next_path(SQLITE, "").await?;
        config.db().copy_to(&path).await?;
        self.rotate(SQLITE, "").await?;
        Ok(path)
    }

    /// All files in the backups directory, oldest name first within each prefix.
    pub async fn list(&self) -> Result<Vec<BackupEntry>> {
        let mut entries = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            entries.push(BackupEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                size: utils::file_size(&path).await?,
                path,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn next_path(&self, prefix: &str, extension: &str) -> Result<PathBuf> {
        let date = utils::today().format("%Y-%m-%d").to_string();
        let seq = self.next_sequence_number(prefix, &date, extension).await?;
        let filename = if extension.is_empty() {
            format!("{prefix}.{date}-{seq:03}")
        } else {
            format!("{prefix}.{date}-{seq:03}.{extension}")
        };
        Ok(self.backups_dir.join(filename))
    }

    /// Scans the backups directory for existing files with the given prefix and date,
    /// and returns the next sequence number.
    async fn next_sequence_number(&self, prefix: &str, date: &str, extension: &str) -> Result<u32> {
        let mut max_seq: u32 = 0;
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(seq) = parse_sequence_number(&name, prefix, date, extension) {
                max_seq = max_seq.max(seq);
            }
        }
        Ok(max_seq + 1)
    }

    /// Rotates old backup files, keeping only `backup_copies` files with the given prefix.
    async fn rotate(&self, prefix: &str, extension: &str) -> Result<()> {
        let mut files: Vec<(PathBuf, (NaiveDate, u32))> = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(stamp) = backup_stamp(&name, prefix, extension) {
                files.push((entry.path(), stamp));
            }
        }

        files.sort_by_key(|(_, stamp)| *stamp);

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            utils::remove(&path).await?;
        }
        Ok(())
    }
}

/// Parses the sequence number from a backup filename.
/// Returns None if the filename doesn't match the expected pattern.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str, extension: &str) -> Option<u32> {
    let remainder = filename.strip_prefix(&format!("{prefix}.{date}-"))?;
    let seq = if extension.is_empty() {
        remainder
    } else {
        remainder.strip_suffix(&format!(".{extension}"))?
    };
    if seq.len() < 3 || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    seq.parse().ok()
}

/// The date and sequence number of a backup file with the given prefix and extension, or `None`
/// for any other file.
fn backup_stamp(filename: &str, prefix: &str, extension: &str) -> Option<(NaiveDate, u32)> {
    let rest = filename.strip_prefix(&format!("{prefix}."))?;
    let stem = if extension.is_empty() {
        rest
    } else {
        rest.strip_suffix(&format!(".{extension}"))?
    };
    // YYYY-MM-DD-NNN
    let date = NaiveDate::parse_from_str(stem.get(..10)?, "%Y-%m-%d").ok()?;
    let seq = stem.get(10..)?.strip_prefix('-')?;
    if seq.len() < 3 || !seq.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((date, seq.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use crate::ErrorType;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("auto.2025-12-14-001.json", "auto", "2025-12-14", "json"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("backup.2025-12-14-042.json", "backup", "2025-12-14", "json"),
            Some(42)
        );
        assert_eq!(
            parse_sequence_number(
                "banksampah.sqlite.2025-12-14-003",
                "banksampah.sqlite",
                "2025-12-14",
                ""
            ),
            Some(3)
        );
        assert_eq!(
            parse_sequence_number("pre-reset.2025-12-14-001.json", "auto", "2025-12-14", "json"),
            None
        );
        assert_eq!(
            parse_sequence_number("auto.2025-12-13-001.json", "auto", "2025-12-14", "json"),
            None
        );
    }

    #[test]
    fn test_backup_stamp() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 14).unwrap();
        assert_eq!(
            backup_stamp("auto.2025-12-14-001.json", "auto", "json"),
            Some((date, 1))
        );
        assert_eq!(
            backup_stamp("pre-restore.2025-12-14-1000.json", "pre-restore", "json"),
            Some((date, 1000))
        );
        assert_eq!(
            backup_stamp("banksampah.sqlite.2025-12-14-001", "banksampah.sqlite", ""),
            Some((date, 1))
        );
        assert_eq!(backup_stamp("auto.2025-12-14-001.json", "backup", "json"), None);
        assert_eq!(
            backup_stamp("banksampah.sqlite.2025-12-14-001.json", "banksampah.sqlite", ""),
            None
        );
        assert_eq!(backup_stamp("auto.2025-13-40-001.json", "auto", "json"), None);
        assert_eq!(backup_stamp("auto.2025-12-14-01.json", "auto", "json"), None);
    }

    #[tokio::test]
    async fn test_rotation_orders_by_sequence_number() {
        let env = TestEnv::new().await;
        let backup = env.config().backup();
        let dir = env.config().backups();
        for seq in ["996", "997", "998", "999", "1000"] {
            utils::write(dir.join(format!("auto.2025-01-01-{seq}.json")), "{}")
                .await
                .unwrap();
        }
        let data = env.config().db().snapshot().await.unwrap();
        backup.save_json(AUTO, &data).await.unwrap();
        assert!(!dir.join("auto.2025-01-01-996.json").exists());
        assert!(dir.join("auto.2025-01-01-999.json").exists());
        assert!(dir.join("auto.2025-01-01-1000.json").exists());
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for bad in [
            "",
            "not json",
            "{}",
            r#"{"format_version": 1}"#,
            r#"{"format_version": 99, "exported_at": "2025-03-01T00:00:00Z"}"#,
            r#"{"format_version": 1, "exported_at": "2025-03-01T00:00:00Z", "groups": 5}"#,
        ] {
            let err = BackupFile::parse(bad).unwrap_err();
            assert_eq!(Error::type_of(&err), Some(ErrorType::Backup), "{bad}");
            assert!(err.to_string().starts_with("Invalid backup file"), "{bad}");
        }
    }

    #[test]
    fn test_parse_minimal_backup() {
        let file = BackupFile::parse(
            r#"{"format_version": 1, "exported_at": "2025-03-01T00:00:00Z", "groups": []}"#,
        )
        .unwrap();
        assert!(file.data.groups.is_empty());
        assert!(file.data.app_settings.auto_backup);
    }

    #[tokio::test]
    async fn test_save_json_rotates() {
        let env = TestEnv::new().await;
        let backup = env.config().backup();
        let data = env.config().db().snapshot().await.unwrap();
        let mut paths = Vec::new();
        for _ in 0..7 {
            paths.push(backup.save_json(AUTO, &data).await.unwrap());
        }
        let listed = backup.list().await.unwrap();
        let autos: Vec<_> = listed.iter().filter(|e| e.name.starts_with("auto.")).collect();
        assert_eq!(autos.len(), 5);
        assert!(!paths[0].exists());
        assert!(paths[6].exists());
        assert!(paths[6].to_string_lossy().ends_with("-007.json"));

        let loaded = BackupFile::load(&paths[6]).await.unwrap();
        assert_eq!(loaded.data, data);
    }

    #[tokio::test]
    async fn test_copy_sqlite() {
        let env = TestEnv::new().await;
        let path = env
            .config()
            .backup()
            .copy_sqlite(env.config())
            .await
            .unwrap();
        assert!(path.is_file());
        assert!(utils::file_size(&path).await.unwrap() > 0);
    }
}
