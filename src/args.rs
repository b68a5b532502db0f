//! These structs provide the CLI interface for the banksampah CLI.

use crate::commands::{OutputFormat, ReportFormat};
use crate::export::ExportKind;
use crate::model::{Amount, GroupUpdates, Role, SettingsUpdates, UserUpdates, Weight};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// banksampah: bookkeeping for a community waste bank.
///
/// Member groups (RT) bring sorted waste to the bank. Each deposit is weighed, valued at the
/// current price per kilogram and credited to the group's savings. Groups can withdraw from their
/// savings, and the bank can produce period reports, a dashboard and backups.
///
/// Start with `banksampah init`, which creates the data directory and the first admin account.
/// Every other command needs a login session (`banksampah login`).
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the database and the first admin account.
    ///
    /// The data directory is --home (default $HOME/banksampah). The admin password can be given
    /// with --admin-password or the BANKSAMPAH_ADMIN_PASSWORD environment variable. After init
    /// the admin is logged in.
    Init(InitArgs),
    /// Log in. Replaces any session this data directory already has.
    Login(LoginArgs),
    /// End the current session.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// Manage member groups (RT).
    #[command(subcommand)]
    Group(GroupCommand),
    /// Show and change the waste price list.
    #[command(subcommand)]
    Price(PriceCommand),
    /// Record and list waste deposits.
    #[command(subcommand)]
    Deposit(DepositCommand),
    /// Savings balances, withdrawals and the transaction ledger.
    #[command(subcommand)]
    Savings(SavingsCommand),
    /// Manage user accounts (admin only).
    #[command(subcommand)]
    User(UserCommand),
    /// Show and change the waste bank settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Save and list backups.
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Replace all bookkeeping data with the content of a JSON backup (admin only).
    ///
    /// The backup is checked before anything changes and the current data is saved to a
    /// pre-restore backup first. User accounts are kept.
    Restore(RestoreArgs),
    /// Erase all bookkeeping data and restore the default prices and settings (admin only).
    ///
    /// The current data is saved to a pre-reset backup first. User accounts are kept.
    Reset(ResetArgs),
    /// Export records as CSV or the full data set as JSON.
    #[command(subcommand)]
    Export(ExportCommand),
    /// Produce the period report: summary, waste types, group ranking and daily trend.
    Report(ReportArgs),
    /// Show today's figures, recent transactions and the largest savings.
    Dashboard(DashboardArgs),
    /// Show record counts and the size of the database.
    Stats(FormatArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber EnvFilter documentation.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where banksampah data and configuration is held. Defaults to ~/banksampah
    #[arg(long, env = "BANKSAMPAH_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `banksampah init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The username of the first admin.
    #[arg(long, default_value = "admin")]
    admin_username: String,

    /// The display name of the first admin.
    #[arg(long, default_value = "Administrator")]
    admin_name: String,

    /// The password of the first admin.
    #[arg(long, env = "BANKSAMPAH_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: String,
}

impl InitArgs {
    pub fn new(
        admin_username: impl Into<String>,
        admin_name: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            admin_username: admin_username.into(),
            admin_name: admin_name.into(),
            admin_password: admin_password.into(),
        }
    }

    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    pub fn admin_name(&self) -> &str {
        &self.admin_name
    }

    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }
}

/// Args for the `banksampah login` command.
#[derive(Debug, Parser, Clone)]
pub struct LoginArgs {
    #[arg(long, short)]
    username: String,

    #[arg(long, short, env = "BANKSAMPAH_PASSWORD", hide_env_values = true)]
    password: String,
}

impl LoginArgs {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Output format for listings.
#[derive(Debug, ClapArgs, Clone, Default)]
pub struct FormatArgs {
    /// How to print the rows: table, json or csv.
    #[arg(long, short, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl FormatArgs {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum GroupCommand {
    /// Add a group.
    Add(GroupAddArgs),
    /// Change a group's name or details.
    Update(GroupUpdateArgs),
    /// Delete a group that has no deposits or transactions (admin only).
    Delete(GroupRef),
    /// List groups with their savings balance.
    List(FormatArgs),
}

/// Args for `banksampah group add`.
#[derive(Debug, Parser, Clone)]
pub struct GroupAddArgs {
    /// The group name, e.g. "RT 01". Must be unique ignoring case.
    name: String,

    /// The person responsible for the group.
    #[arg(long, default_value = "")]
    leader: String,

    /// The number of households in the group.
    #[arg(long)]
    households: Option<u32>,

    #[arg(long, default_value = "")]
    address: String,
}

impl GroupAddArgs {
    pub fn new(
        name: impl Into<String>,
        leader: impl Into<String>,
        households: Option<u32>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            leader: leader.into(),
            households,
            address: address.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn leader(&self) -> &str {
        &self.leader
    }

    pub fn households(&self) -> Option<u32> {
        self.households
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Args for `banksampah group update`.
#[derive(Debug, Parser, Clone)]
pub struct GroupUpdateArgs {
    /// The group's id or current name.
    group: String,

    /// A new name.
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    leader: Option<String>,

    #[arg(long)]
    households: Option<u32>,

    #[arg(long)]
    address: Option<String>,
}

impl GroupUpdateArgs {
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn updates(&self) -> GroupUpdates {
        GroupUpdates {
            name: self.name.clone(),
            leader: self.leader.clone(),
            households: self.households,
            address: self.address.clone(),
        }
    }
}

/// Identifies one group.
#[derive(Debug, Parser, Clone)]
pub struct GroupRef {
    /// The group's id or name.
    group: String,
}

impl GroupRef {
    pub fn group(&self) -> &str {
        &self.group
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum PriceCommand {
    /// List waste types and their price per kilogram.
    List(FormatArgs),
    /// Change the price of a waste type (admin only). Past deposits keep their price.
    Set(PriceSetArgs),
    /// Add a waste type (admin only).
    Add(PriceAddArgs),
    /// Remove a waste type that no deposit refers to (admin only).
    Remove(WasteRef),
}

/// Args for `banksampah price set`.
#[derive(Debug, Parser, Clone)]
pub struct PriceSetArgs {
    /// The waste type's id or name.
    waste: String,

    /// The new price per kilogram in Rupiah, e.g. 5500 or Rp5.500
    price: Amount,
}

impl PriceSetArgs {
    pub fn waste(&self) -> &str {
        &self.waste
    }

    pub fn price(&self) -> Amount {
        self.price
    }
}

/// Args for `banksampah price add`.
#[derive(Debug, Parser, Clone)]
pub struct PriceAddArgs {
    /// A short identifier such as "minyak".
    id: String,

    /// The display name, e.g. "Minyak Jelantah".
    name: String,

    /// The price per kilogram in Rupiah.
    price: Amount,
}

impl PriceAddArgs {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Amount) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Amount {
        self.price
    }
}

/// Identifies one waste type.
#[derive(Debug, Parser, Clone)]
pub struct WasteRef {
    /// The waste type's id or name.
    waste: String,
}

impl WasteRef {
    pub fn waste(&self) -> &str {
        &self.waste
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum DepositCommand {
    /// Record a deposit and credit its value to the group's savings.
    Record(DepositArgs),
    /// List deposits, newest first.
    List(RecordFilterArgs),
}

/// Args for `banksampah deposit record`.
#[derive(Debug, Parser, Clone)]
pub struct DepositArgs {
    /// The group's id or name.
    #[arg(long, short)]
    group: String,

    /// The waste type's id or name.
    #[arg(long, short)]
    waste: String,

    /// The weight in kilograms, e.g. 12.5
    #[arg(long)]
    weight: Weight,

    /// The deposit date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long, default_value = "")]
    notes: String,
}

impl DepositArgs {
    pub fn new(
        group: impl Into<String>,
        waste: impl Into<String>,
        weight: Weight,
        date: Option<NaiveDate>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            waste: waste.into(),
            weight,
            date,
            notes: notes.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn waste(&self) -> &str {
        &self.waste
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

/// Narrows a listing of deposits or transactions.
#[derive(Debug, Parser, Clone, Default)]
pub struct RecordFilterArgs {
    /// Only this group (id or name).
    #[arg(long, short)]
    group: Option<String>,

    /// The first date to include (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// The last date to include (YYYY-MM-DD).
    #[arg(long)]
    end: Option<NaiveDate>,

    /// At most this many rows.
    #[arg(long)]
    limit: Option<u32>,

    #[clap(flatten)]
    format: FormatArgs,
}

impl RecordFilterArgs {
    pub fn new(
        group: Option<String>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        limit: Option<u32>,
        format: OutputFormat,
    ) -> Self {
        Self {
            group,
            start,
            end,
            limit,
            format: FormatArgs::new(format),
        }
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn format(&self) -> OutputFormat {
        self.format.format()
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SavingsCommand {
    /// List savings balances, largest first.
    List(FormatArgs),
    /// Withdraw from a group's savings.
    Withdraw(WithdrawArgs),
    /// List ledger transactions, newest first.
    History(RecordFilterArgs),
    /// Recompute every balance from the ledger and report disagreements.
    Audit,
}

/// Args for `banksampah savings withdraw`.
#[derive(Debug, Parser, Clone)]
pub struct WithdrawArgs {
    /// The group's id or name.
    #[arg(long, short)]
    group: String,

    /// The amount in Rupiah.
    #[arg(long, short)]
    amount: Amount,

    /// The withdrawal date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long)]
    description: Option<String>,
}

impl WithdrawArgs {
    pub fn new(
        group: impl Into<String>,
        amount: Amount,
        date: Option<NaiveDate>,
        description: Option<String>,
    ) -> Self {
        Self {
            group: group.into(),
            amount,
            date,
            description,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Create a user account.
    Add(UserAddArgs),
    /// Change a user's username, name, role or password.
    Update(UserUpdateArgs),
    /// Delete a user account. You cannot delete yourself or the last admin.
    Delete(UserRef),
    /// List user accounts.
    List(FormatArgs),
}

/// Args for `banksampah user add`.
#[derive(Debug, Parser, Clone)]
pub struct UserAddArgs {
    username: String,

    /// The person's display name.
    #[arg(long)]
    name: String,

    /// admin or operator
    #[arg(long, default_value_t = Role::Operator)]
    role: Role,

    #[arg(long, env = "BANKSAMPAH_USER_PASSWORD", hide_env_values = true)]
    password: String,
}

impl UserAddArgs {
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
            role,
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Args for `banksampah user update`.
#[derive(Debug, Parser, Clone)]
pub struct UserUpdateArgs {
    /// The user's id or current username.
    user: String,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    role: Option<Role>,

    #[arg(long, env = "BANKSAMPAH_USER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl UserUpdateArgs {
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn updates(&self) -> UserUpdates {
        UserUpdates {
            username: self.username.clone(),
            name: self.name.clone(),
            role: self.role,
            password: self.password.clone(),
        }
    }
}

/// Identifies one user.
#[derive(Debug, Parser, Clone)]
pub struct UserRef {
    /// The user's id or username.
    user: String,
}

impl UserRef {
    pub fn user(&self) -> &str {
        &self.user
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Show the current settings.
    Show,
    /// Change one or more settings (admin only).
    Set(SettingsSetArgs),
}

/// Args for `banksampah settings set`. Only the given settings change.
#[derive(Debug, Parser, Clone)]
pub struct SettingsSetArgs {
    /// Save a backup after every deposit and withdrawal.
    #[arg(long)]
    auto_backup: Option<bool>,

    #[arg(long)]
    notifications: Option<bool>,

    #[arg(long)]
    email_reports: Option<bool>,

    #[arg(long)]
    whatsapp_notifications: Option<bool>,

    #[arg(long)]
    data_retention_days: Option<u32>,

    /// The name of the neighbourhood (RW) the bank serves.
    #[arg(long)]
    rw_name: Option<String>,

    #[arg(long)]
    contact_person: Option<String>,

    #[arg(long)]
    contact_phone: Option<String>,

    #[arg(long)]
    address: Option<String>,
}

impl SettingsSetArgs {
    pub fn updates(&self) -> SettingsUpdates {
        SettingsUpdates {
            auto_backup: self.auto_backup,
            notifications: self.notifications,
            email_reports: self.email_reports,
            whatsapp_notifications: self.whatsapp_notifications,
            data_retention_days: self.data_retention_days,
            rw_name: self.rw_name.clone(),
            contact_person: self.contact_person.clone(),
            contact_phone: self.contact_phone.clone(),
            address: self.address.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum BackupCommand {
    /// Save a JSON backup of all bookkeeping data.
    Create(BackupCreateArgs),
    /// List the files in the backups directory.
    List(FormatArgs),
}

/// Args for `banksampah backup create`.
#[derive(Debug, Parser, Clone)]
pub struct BackupCreateArgs {
    /// Also save a copy of the SQLite database file.
    #[arg(long)]
    sqlite: bool,
}

impl BackupCreateArgs {
    pub fn sqlite(&self) -> bool {
        self.sqlite
    }
}

/// Args for `banksampah restore`.
#[derive(Debug, Parser, Clone)]
pub struct RestoreArgs {
    /// The JSON backup file to restore.
    file: PathBuf,
}

impl RestoreArgs {
    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// Args for `banksampah reset`.
#[derive(Debug, Parser, Clone)]
pub struct ResetArgs {
    /// Confirm that all deposits, savings and transactions should be erased.
    #[arg(long)]
    yes: bool,
}

impl ResetArgs {
    pub fn yes(&self) -> bool {
        self.yes
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExportCommand {
    /// Export one kind of record as CSV.
    Csv(ExportCsvArgs),
    /// Export all bookkeeping data as JSON in the backup format.
    Json(OutArgs),
}

/// Args for `banksampah export csv`.
#[derive(Debug, Parser, Clone)]
pub struct ExportCsvArgs {
    /// Which records to export.
    kind: ExportKind,

    #[clap(flatten)]
    out: OutArgs,
}

impl ExportCsvArgs {
    pub fn kind(&self) -> ExportKind {
        self.kind
    }

    pub fn out(&self) -> Option<&Path> {
        self.out.out()
    }
}

/// Where to write output.
#[derive(Debug, ClapArgs, Clone, Default)]
pub struct OutArgs {
    /// The file to write. Prints to stdout when omitted.
    #[arg(long, short)]
    out: Option<PathBuf>,
}

impl OutArgs {
    pub fn out(&self) -> Option<&Path> {
        self.out.as_deref()
    }
}

/// Args for `banksampah report`.
#[derive(Debug, Parser, Clone, Default)]
pub struct ReportArgs {
    /// The first day of the period (YYYY-MM-DD). Defaults to the first day of the current month.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// The last day of the period (YYYY-MM-DD). Defaults to the last day of the current month.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// The last day of the daily trend. Defaults to today, or to the period end if that is
    /// earlier.
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// table, json or csv. The csv format writes one file per sheet into --out.
    #[arg(long, short, default_value_t = ReportFormat::Table)]
    format: ReportFormat,

    /// A file for table and json, a directory for csv. Prints to stdout when omitted.
    #[arg(long, short, required_if_eq("format", "csv"))]
    out: Option<PathBuf>,
}

impl ReportArgs {
    pub fn new(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        as_of: Option<NaiveDate>,
        format: ReportFormat,
        out: Option<PathBuf>,
    ) -> Self {
        Self {
            start,
            end,
            as_of,
            format,
            out,
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn out(&self) -> Option<&Path> {
        self.out.as_deref()
    }
}

/// Args for `banksampah dashboard`.
#[derive(Debug, Parser, Clone, Default)]
pub struct DashboardArgs {
    /// The day to show. Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,

    #[clap(flatten)]
    format: FormatArgs,
}

impl DashboardArgs {
    pub fn as_of(&self) -> Option<NaiveDate> {
        self.as_of
    }

    pub fn format(&self) -> OutputFormat {
        self.format.format()
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("banksampah"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or BANKSAMPAH_HOME instead of relying on the default \
                data directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("banksampah")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("banksampah").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        <Args as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_deposit() {
        let args = parse(&[
            "--home", "/tmp/bs", "deposit", "record", "-g", "RT 01", "-w", "plastik", "--weight",
            "12,5", "--date", "2025-03-01",
        ]);
        assert_eq!(args.common().home().path(), Path::new("/tmp/bs"));
        let Command::Deposit(DepositCommand::Record(deposit)) = args.command() else {
            panic!("expected deposit record");
        };
        assert_eq!(deposit.group(), "RT 01");
        assert_eq!(deposit.weight(), Weight::from_str("12.5").unwrap());
        assert_eq!(deposit.date(), NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_parse_rupiah_amount() {
        let args = parse(&["savings", "withdraw", "-g", "RT 01", "-a", "Rp10.000"]);
        let Command::Savings(SavingsCommand::Withdraw(w)) = args.command() else {
            panic!("expected savings withdraw");
        };
        assert_eq!(w.amount(), Amount::rupiah(10_000));
        assert_eq!(w.date(), None);
    }

    #[test]
    fn test_parse_settings_updates() {
        let args = parse(&["settings", "set", "--auto-backup", "false", "--rw-name", "RW 05"]);
        let Command::Settings(SettingsCommand::Set(set)) = args.command() else {
            panic!("expected settings set");
        };
        let updates = set.updates();
        assert_eq!(updates.auto_backup, Some(false));
        assert_eq!(updates.rw_name.as_deref(), Some("RW 05"));
        assert_eq!(updates.notifications, None);
    }

    #[test]
    fn test_report_csv_needs_out() {
        let argv = ["banksampah", "report", "--format", "csv"];
        assert!(Args::try_parse_from(argv).is_err());
        let args = parse(&["report", "--format", "csv", "--out", "laporan"]);
        let Command::Report(report) = args.command() else {
            panic!("expected report");
        };
        assert_eq!(report.format(), ReportFormat::Csv);
        assert_eq!(report.out(), Some(Path::new("laporan")));
    }

    #[test]
    fn test_parse_user_role() {
        let args = parse(&["user", "add", "sari", "--name", "Sari", "--role", "admin", "--password", "x"]);
        let Command::User(UserCommand::Add(add)) = args.command() else {
            panic!("expected user add");
        };
        assert_eq!(add.role(), Role::Admin);
    }
}
