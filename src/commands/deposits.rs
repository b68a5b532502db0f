//! Deposit command handlers.

use crate::args::{DepositArgs, RecordFilterArgs};
use crate::commands::groups::find_group;
use crate::commands::prices::find_price;
use crate::commands::{auto_backup, plural, Out, Rows};
use crate::db::{DepositFilter, DepositReceipt, NewDeposit};
use crate::error::{ErrorType, IntoResult};
use crate::{auth, utils, Config, Result};
use std::collections::HashMap;
use tracing::warn;

/// Records a weigh-in for a group and credits its value to the group's savings.
///
/// The value is the weight times the current price of the waste type, rounded to whole Rupiah.
/// When the `auto_backup` setting is on an `auto` backup is saved afterwards.
pub async fn deposit_record(config: Config, args: DepositArgs) -> Result<Out<DepositReceipt>> {
    let user = auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let group = find_group(&config, args.group()).await?;
    let price = find_price(&config, args.waste()).await?;
    let receipt = config
        .db()
        .record_deposit(NewDeposit {
            group_id: group.id.clone(),
            waste_type_id: price.id.clone(),
            weight: args.weight(),
            date: args.date().unwrap_or_else(utils::today),
            notes: args.notes().trim().to_string(),
            recorded_by: Some(user.id),
        })
        .await
        .pub_result(ErrorType::Database)?;
    if let Err(e) = auto_backup(&config).await {
        warn!("The deposit was recorded but the automatic backup failed: {e:#}");
    }
    let message = format!(
        "Recorded {} of {} for {} worth {}. Balance is now {}",
        receipt.deposit.weight_kg,
        price.name,
        group.name,
        receipt.deposit.value,
        receipt.savings.balance
    );
    Ok(Out::new(message, receipt))
}

/// Lists deposits newest first, optionally narrowed to a group and a date range.
pub async fn deposit_list(config: Config, args: RecordFilterArgs) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let filter = record_filter(&config, &args).await?;
    let db = config.db();
    let deposits = db
        .list_deposits(&filter)
        .await
        .pub_result(ErrorType::Database)?;
    let groups = group_names(&config).await?;
    let wastes: HashMap<String, String> = db
        .list_prices()
        .await
        .pub_result(ErrorType::Database)?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let cells = deposits
        .iter()
        .map(|d| {
            vec![
                d.date.to_string(),
                name_or_id(&groups, &d.group_id),
                name_or_id(&wastes, &d.waste_type_id),
                d.weight_kg.to_string(),
                d.price_per_kg.to_string(),
                d.value.to_string(),
                d.notes.clone(),
            ]
        })
        .collect();
    let rows = Rows::render(
        args.format(),
        &deposits,
        &["Date", "Group", "Waste", "Weight", "Price/kg", "Value", "Notes"],
        cells,
    )?;
    Ok(Out::new(plural(deposits.len(), "deposit"), rows))
}

/// Turns listing arguments into a database filter, resolving the group name.
pub(super) async fn record_filter(
    config: &Config,
    args: &RecordFilterArgs,
) -> Result<DepositFilter> {
    let group_id = match args.group() {
        Some(group) => Some(find_group(config, group).await?.id),
        None => None,
    };
    Ok(DepositFilter {
        group_id,
        start: args.start(),
        end: args.end(),
        limit: args.limit(),
    })
}

/// Group names keyed by id.
pub(super) async fn group_names(config: &Config) -> Result<HashMap<String, String>> {
    Ok(config
        .db()
        .list_groups()
        .await
        .pub_result(ErrorType::Database)?
        .into_iter()
        .map(|g| (g.group.id, g.group.name))
        .collect())
}

pub(super) fn name_or_id(names: &HashMap<String, String>, id: &str) -> String {
    names.get(id).cloned().unwrap_or_else(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OutputFormat;
    use crate::model::{Amount, SettingsUpdates, Weight};
    use crate::test::TestEnv;
    use crate::{Error, ErrorType};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 3, d)
    }

    fn kg(s: &str) -> Weight {
        Weight::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_record_by_names() {
        let env = TestEnv::new().await;
        env.add_group("RT 01").await;
        let out = deposit_record(
            env.config().clone(),
            DepositArgs::new("rt 01", "Kertas", kg("2.5"), day(1), "kering"),
        )
        .await
        .unwrap();
        assert_eq!(
            out.message(),
            "Recorded 2.5 kg of Kertas for RT 01 worth Rp7.500. Balance is now Rp7.500"
        );
        let receipt = out.structure().unwrap();
        assert_eq!(receipt.deposit.recorded_by.as_ref(), Some(&env.admin().id));
        assert_eq!(receipt.transaction.description, "Setoran Kertas 2.5 kg");
    }

    #[tokio::test]
    async fn test_value_rounds_to_whole_rupiah() {
        let env = TestEnv::new().await;
        env.add_group("RT 01").await;
        // 0.333 kg of Kardus at 2500 is 832.5, which rounds away from zero
        let out = deposit_record(
            env.config().clone(),
            DepositArgs::new("RT 01", "kardus", kg("0.333"), day(1), ""),
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().deposit.value, Amount::rupiah(833));
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let env = TestEnv::new().await;
        env.add_group("RT 01").await;
        for args in [
            DepositArgs::new("RT 01", "plastik", kg("0"), day(1), ""),
            DepositArgs::new("RT 01", "plastik", kg("-1"), day(1), ""),
            DepositArgs::new("RT 09", "plastik", kg("1"), day(1), ""),
            DepositArgs::new("RT 01", "emas", kg("1"), day(1), ""),
        ] {
            let err = deposit_record(env.config().clone(), args).await.unwrap_err();
            assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
        }
        assert!(env.config().db().list_savings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auto_backup_follows_setting() {
        let env = TestEnv::new().await;
        env.add_group("RT 01").await;
        let record = || {
            deposit_record(
                env.config().clone(),
                DepositArgs::new("RT 01", "logam", kg("1"), day(2), ""),
            )
        };
        record().await.unwrap();
        let autos = |list: Vec<crate::backup::BackupEntry>| {
            list.iter().filter(|e| e.name.starts_with("auto.")).count()
        };
        assert_eq!(autos(env.config().backup().list().await.unwrap()), 1);

        env.config()
            .db()
            .update_settings(SettingsUpdates {
                auto_backup: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        record().await.unwrap();
        assert_eq!(autos(env.config().backup().list().await.unwrap()), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_group_and_date() {
        let env = TestEnv::new().await;
        env.add_group("RT 01").await;
        env.add_group("RT 02").await;
        for (group, d) in [("RT 01", 1), ("RT 02", 2), ("RT 01", 3), ("RT 01", 9)] {
            deposit_record(
                env.config().clone(),
                DepositArgs::new(group, "plastik", kg("1"), day(d), ""),
            )
            .await
            .unwrap();
        }
        let args = RecordFilterArgs::new(
            Some("RT 01".to_string()),
            day(1),
            day(5),
            None,
            OutputFormat::Csv,
        );
        let out = deposit_list(env.config().clone(), args).await.unwrap();
        assert_eq!(out.message(), "2 deposits");
        let csv = out.structure().unwrap().to_string();
        let dates: Vec<&str> = csv
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(dates, vec!["2025-03-03", "2025-03-01"]);
    }
}
