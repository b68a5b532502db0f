//! Backup, restore, reset and export command handlers.

use crate::backup::{BackupFile, BACKUP, PRE_RESET, PRE_RESTORE};
use crate::commands::{plural, Out, OutputFormat, Rows};
use crate::error::{ErrorType, IntoResult};
use crate::export::{self, ExportKind};
use crate::{auth, ledger, utils, Config, Error, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Saves a JSON backup of the bookkeeping records and, with `sqlite`, a copy of the database.
pub async fn backup_create(config: Config, sqlite: bool) -> Result<Out<Vec<PathBuf>>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let data = config
        .db()
        .snapshot()
        .await
        .pub_result(ErrorType::Database)?;
    let backup = config.backup();
    let mut paths = vec![backup
        .save_json(BACKUP, &data)
        .await
        .pub_result(ErrorType::Backup)?];
    if sqlite {
        paths.push(
            backup
                .copy_sqlite(&config)
                .await
                .pub_result(ErrorType::Backup)?,
        );
    }
    let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    Ok(Out::new(
        format!("Backup written to {}", names.join(" and ")),
        paths,
    ))
}

/// Lists the files in the backups directory.
pub async fn backup_list(config: Config, format: OutputFormat) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let entries = config
        .backup()
        .list()
        .await
        .pub_result(ErrorType::Backup)?;
    let cells = entries
        .iter()
        .map(|e| vec![e.name.clone(), e.size.to_string()])
        .collect();
    let rows = Rows::render(format, &entries, &["Name", "Bytes"], cells)?;
    Ok(Out::new(plural(entries.len(), "backup file"), rows))
}

/// Replaces all bookkeeping records with the content of a JSON backup file. Admin only.
///
/// The file is parsed and checked before anything is touched, so a bad file leaves the store as
/// it was. The current records are saved as a `pre-restore` backup first. User accounts are not
/// part of a backup and are kept.
pub async fn restore(config: Config, file: &Path) -> Result<Out<PathBuf>> {
    let admin = auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let backup = BackupFile::load(file)
        .await
        .pub_result(ErrorType::Backup)?;
    ledger::validate(&backup.data).pub_result(ErrorType::Backup)?;
    debug!(
        "Backup from {} has format version {}",
        backup.exported_at, backup.format_version
    );

    let db = config.db();
    let current = db.snapshot().await.pub_result(ErrorType::Database)?;
    let saved = config
        .backup()
        .save_json(PRE_RESTORE, &current)
        .await
        .pub_result(ErrorType::Backup)?;
    db.replace_all(&backup.data)
        .await
        .pub_result(ErrorType::Database)?;
    info!("{} restored the records from {}", admin.username, file.display());
    Ok(Out::new(
        format!(
            "Restored {}, {} and {} from {}. The previous records were saved to {}",
            plural(backup.data.groups.len(), "group"),
            plural(backup.data.waste_deposits.len(), "deposit"),
            plural(backup.data.transactions.len(), "transaction"),
            file.display(),
            saved.display()
        ),
        saved,
    ))
}

/// Erases all groups, deposits, savings and transactions and puts back the default waste prices
/// and settings. Admin only, and only with `yes`. User accounts are kept.
pub async fn reset(config: Config, yes: bool) -> Result<Out<PathBuf>> {
    let admin = auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    if !yes {
        return Err(Error::request(
            "Resetting erases every record. Pass --yes to confirm",
        )
        .into());
    }
    let db = config.db();
    let current = db.snapshot().await.pub_result(ErrorType::Database)?;
    let saved = config
        .backup()
        .save_json(PRE_RESET, &current)
        .await
        .pub_result(ErrorType::Backup)?;
    db.reset().await.pub_result(ErrorType::Database)?;
    info!("{} reset the records", admin.username);
    Ok(Out::new(
        format!(
            "All records erased. The previous records were saved to {}",
            saved.display()
        ),
        saved,
    ))
}

/// Exports one kind of record as CSV, to stdout or to `out`.
pub async fn export_csv(config: Config, kind: ExportKind, out: Option<&Path>) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let data = config
        .db()
        .snapshot()
        .await
        .pub_result(ErrorType::Database)?;
    let csv = export::records_csv(&data, kind)?;
    emit(format!("Exported {kind}"), Rows::Csv(csv), out).await
}

/// Exports every bookkeeping record as one JSON document in the backup file layout.
pub async fn export_json(config: Config, out: Option<&Path>) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let data = config
        .db()
        .snapshot()
        .await
        .pub_result(ErrorType::Database)?;
    let file = BackupFile::new(data);
    let json = serde_json::to_value(&file).context("Unable to serialize the records")?;
    emit(String::from("Exported all records"), Rows::Json(json), out).await
}

async fn emit(message: String, rows: Rows, out: Option<&Path>) -> Result<Out<Rows>> {
    match out {
        Some(path) => {
            utils::write(path, rows.to_string())
                .await
                .pub_result(ErrorType::Request)?;
            Ok(Out::new_message(format!("{message} to {}", path.display())))
        }
        None => Ok(Out::new(message, rows)),
    }
}
