use banksampah::args::{
    Args, BackupCommand, Command, DepositCommand, ExportCommand, GroupCommand, PriceCommand,
    SavingsCommand, SettingsCommand, UserCommand,
};
use banksampah::{commands, Config, ErrorType, IntoResult, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // Every command except init works on an existing data directory.
    let config = match args.command() {
        Command::Init(init_args) => {
            commands::init(
                home,
                init_args.admin_username(),
                init_args.admin_name(),
                init_args.admin_password(),
            )
            .await?
            .print();
            return Ok(());
        }
        _ => Config::load(home).await.pub_result(ErrorType::Config)?,
    };

    let _: () = match args.command() {
        Command::Init(_) => {}

        Command::Login(login_args) => {
            commands::login(config, login_args.username(), login_args.password())
                .await?
                .print()
        }
        Command::Logout => commands::logout(config).await?.print(),
        Command::Whoami => commands::whoami(config).await?.print(),

        Command::Group(group) => match group {
            GroupCommand::Add(args) => commands::group_add(config, args.clone()).await?.print(),
            GroupCommand::Update(args) => {
                commands::group_update(config, args.group(), args.updates())
                    .await?
                    .print()
            }
            GroupCommand::Delete(args) => {
                commands::group_delete(config, args.group()).await?.print()
            }
            GroupCommand::List(args) => commands::group_list(config, args.format())
                .await?
                .print_rows(),
        },

        Command::Price(price) => match price {
            PriceCommand::List(args) => commands::price_list(config, args.format())
                .await?
                .print_rows(),
            PriceCommand::Set(args) => commands::price_set(config, args.waste(), args.price())
                .await?
                .print(),
            PriceCommand::Add(args) => commands::price_add(config, args.clone()).await?.print(),
            PriceCommand::Remove(args) => {
                commands::price_remove(config, args.waste()).await?.print()
            }
        },

        Command::Deposit(deposit) => match deposit {
            DepositCommand::Record(args) => commands::deposit_record(config, args.clone())
                .await?
                .print(),
            DepositCommand::List(args) => commands::deposit_list(config, args.clone())
                .await?
                .print_rows(),
        },

        Command::Savings(savings) => match savings {
            SavingsCommand::List(args) => commands::savings_list(config, args.format())
                .await?
                .print_rows(),
            SavingsCommand::Withdraw(args) => {
                commands::withdraw(config, args.clone()).await?.print()
            }
            SavingsCommand::History(args) => commands::savings_history(config, args.clone())
                .await?
                .print_rows(),
            SavingsCommand::Audit => commands::savings_audit(config).await?.print(),
        },

        Command::User(user) => match user {
            UserCommand::Add(args) => commands::user_add(config, args.clone()).await?.print(),
            UserCommand::Update(args) => {
                commands::user_update(config, args.user(), args.updates())
                    .await?
                    .print()
            }
            UserCommand::Delete(args) => commands::user_delete(config, args.user()).await?.print(),
            UserCommand::List(args) => commands::user_list(config, args.format())
                .await?
                .print_rows(),
        },

        Command::Settings(settings) => match settings {
            SettingsCommand::Show => commands::settings_show(config).await?.print(),
            SettingsCommand::Set(args) => {
                commands::settings_set(config, args.updates()).await?.print()
            }
        },

        Command::Backup(backup) => match backup {
            BackupCommand::Create(args) => commands::backup_create(config, args.sqlite())
                .await?
                .print(),
            BackupCommand::List(args) => commands::backup_list(config, args.format())
                .await?
                .print_rows(),
        },
        Command::Restore(args) => commands::restore(config, args.file()).await?.print(),
        Command::Reset(args) => commands::reset(config, args.yes()).await?.print(),

        Command::Export(export) => match export {
            ExportCommand::Csv(args) => commands::export_csv(config, args.kind(), args.out())
                .await?
                .print_rows(),
            ExportCommand::Json(args) => commands::export_json(config, args.out())
                .await?
                .print_rows(),
        },

        Command::Report(args) => commands::report(config, args.clone()).await?.print_rows(),
        Command::Dashboard(args) => commands::dashboard(config, args.clone())
            .await?
            .print_rows(),
        Command::Stats(args) => commands::stats(config, args.format()).await?.print_rows(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        // RUST_LOG exists; use it.
        Some(_) => EnvFilter::from_default_env(),
        // Otherwise log at the requested level for this crate only.
        None => EnvFilter::new(format!(
            "{}={},{}={}",
            env!("CARGO_CRATE_NAME"),
            level,
            env!("CARGO_BIN_NAME"),
            level
        )),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
