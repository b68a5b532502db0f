pub mod args;
mod auth;
mod backup;
pub mod commands;
mod config;
mod db;
mod error;
mod export;
mod ledger;
pub mod model;
mod report;
mod utils;

#[cfg(test)]
mod test;

pub use backup::{Backup, BackupEntry, BackupFile};
pub use config::Config;
pub use db::{DepositReceipt, GroupWithBalance, WithdrawalReceipt};
pub use error::{Error, ErrorType, IntoResult, Result};
pub use export::ExportKind;
pub use ledger::SavingsMismatch;
pub use report::{Dashboard, Report, SystemStats};
