//! Configuration file handling for banksampah.
//!
//! The configuration file is stored at `$BANKSAMPAH_HOME/config.json` and contains the backup
//! retention setting and, optionally, a custom location for the session file.

use crate::backup::Backup;
use crate::db::Db;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "banksampah";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const BACKUPS: &str = ".backups";
const SESSION: &str = ".session";
const CONFIG_JSON: &str = "config.json";
const BANKSAMPAH_SQLITE: &str = "banksampah.sqlite";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$BANKSAMPAH_HOME` and from there it loads `$BANKSAMPAH_HOME/config.json`. It
/// provides paths to the other items that live in the data directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory, its `.backups` subdirectory, an initial `config.json` and an
    /// empty database holding the default price list and settings.
    ///
    /// # Errors
    /// - Returns an error if a database already exists in `dir` or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the banksampah home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let sqlite_path = root.join(BANKSAMPAH_SQLITE);
        if sqlite_path.exists() {
            bail!("{} is already a banksampah home", root.display());
        }

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        let db = Db::init(&sqlite_path)
            .await
            .context("Unable to create SQLite DB")?;

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    /// This will
    /// - validate that `banksampah_home` exists and that the config file exists
    /// - load the config file
    /// - open the database, migrating it if needed
    /// - validate that the backups directory exists
    pub async fn load(banksampah_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = banksampah_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The banksampah home directory is missing. Did you run 'banksampah init'?")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let sqlite_path = root.join(BANKSAMPAH_SQLITE);
        let db = Db::load(&sqlite_path)
            .await
            .context("Unable to load SQLite DB")?;

        let config = Self {
            backups: root.join(BACKUPS),
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        };
        if !config.backups.is_dir() {
            bail!(
                "The backups directory is missing '{}'",
                config.backups.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }

    /// The file holding the current login token. A relative `session_path` in `config.json` is
    /// resolved against the data directory.
    pub fn session_path(&self) -> PathBuf {
        let p = self.config_file.session_path();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "banksampah",
///   "config_version": 1,
///   "backup_copies": 5,
///   "session_path": ".session"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "banksampah"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Number of backup copies to keep per backup kind
    #[serde(default = "default_backup_copies")]
    backup_copies: u32,

    /// Path to the session token file (optional, relative to config.json or absolute).
    /// Defaults to $BANKSAMPAH_HOME/.session if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_path: Option<PathBuf>,
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backup_copies: BACKUP_COPIES,
            session_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile from the specified path.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.config_version <= CONFIG_VERSION,
            "The config file version {} is newer than this program supports ({CONFIG_VERSION})",
            config.config_version
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SESSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create_then_load() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("banksampah_home");
        let config = Config::create(&home).await.unwrap();
        assert!(config.backups().is_dir());
        assert!(config.config_path().is_file());
        assert!(config.sqlite_path().is_file());
        assert_eq!(config.backup_copies(), 5);
        assert_eq!(config.session_path(), config.root().join(".session"));

        let loaded = Config::load(&home).await.unwrap();
        assert_eq!(loaded.root(), config.root());
    }

    #[tokio::test]
    async fn test_config_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path()).await.unwrap();
        assert!(Config::create(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("nope")).await.unwrap_err();
        assert!(err.to_string().contains("banksampah init"));
    }

    #[tokio::test]
    async fn test_config_file_minimal_and_custom_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        utils::write(
            &path,
            r#"{"app_name": "banksampah", "config_version": 1, "session_path": "/tmp/s"}"#,
        )
        .await
        .unwrap();
        let config = ConfigFile::load(&path).await.unwrap();
        assert_eq!(config.backup_copies, 5);
        assert_eq!(config.session_path(), PathBuf::from("/tmp/s"));
    }

    #[tokio::test]
    async fn test_config_file_invalid_app_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        utils::write(&path, r#"{"app_name": "budget", "config_version": 1}"#)
            .await
            .unwrap();
        let err = ConfigFile::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let original = ConfigFile {
            backup_copies: 9,
            session_path: Some(PathBuf::from("sessions/current")),
            ..Default::default()
        };
        original.save(&path).await.unwrap();
        assert_eq!(ConfigFile::load(&path).await.unwrap(), original);
        let json = serde_json::to_string(&ConfigFile::default()).unwrap();
        assert!(!json.contains("session_path"));
    }
}
