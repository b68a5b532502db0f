//! Savings and transaction ledger command handlers.

use crate::args::{RecordFilterArgs, WithdrawArgs};
use crate::commands::deposits::{group_names, name_or_id, record_filter};
use crate::commands::groups::find_group;
use crate::commands::{auto_backup, plural, OutputFormat, Out, Rows};
use crate::db::{NewWithdrawal, WithdrawalReceipt};
use crate::error::{ErrorType, IntoResult};
use crate::ledger::{self, SavingsMismatch};
use crate::{auth, utils, Config, Result};
use tracing::{info, warn};

/// Lists savings balances, largest first.
pub async fn savings_list(config: Config, format: OutputFormat) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let savings = config
        .db()
        .list_savings()
        .await
        .pub_result(ErrorType::Database)?;
    let groups = group_names(&config).await?;
    let cells = savings
        .iter()
        .map(|s| {
            vec![
                name_or_id(&groups, &s.group_id),
                s.balance.to_string(),
                s.total_deposits.to_string(),
                s.total_withdrawals.to_string(),
                s.transaction_count.to_string(),
                s.last_transaction.to_string(),
            ]
        })
        .collect();
    let rows = Rows::render(
        format,
        &savings,
        &[
            "Group",
            "Balance",
            "Deposits",
            "Withdrawals",
            "Transactions",
            "Last transaction",
        ],
        cells,
    )?;
    Ok(Out::new(plural(savings.len(), "savings account"), rows))
}

/// Takes money out of a group's savings.
///
/// Rejected with a `Request` error when the amount is not positive or exceeds the balance. When
/// the `auto_backup` setting is on an `auto` backup is saved afterwards.
pub async fn withdraw(config: Config, args: WithdrawArgs) -> Result<Out<WithdrawalReceipt>> {
    let user = auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let group = find_group(&config, args.group()).await?;
    let receipt = config
        .db()
        .withdraw(NewWithdrawal {
            group_id: group.id.clone(),
            amount: args.amount(),
            date: args.date().unwrap_or_else(utils::today),
            description: args.description().unwrap_or_default().trim().to_string(),
            recorded_by: Some(user.id),
        })
        .await
        .pub_result(ErrorType::Database)?;
    if let Err(e) = auto_backup(&config).await {
        warn!("The withdrawal was recorded but the automatic backup failed: {e:#}");
    }
    let message = format!(
        "Withdrew {} from {}. Balance is now {}",
        receipt.transaction.amount, group.name, receipt.savings.balance
    );
    Ok(Out::new(message, receipt))
}

/// Lists ledger transactions newest first, optionally narrowed to a group and a date range.
pub async fn savings_history(config: Config, args: RecordFilterArgs) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let filter = record_filter(&config, &args).await?;
    let transactions = config
        .db()
        .list_transactions(&filter)
        .await
        .pub_result(ErrorType::Database)?;
    let groups = group_names(&config).await?;
    let cells = transactions
        .iter()
        .map(|t| {
            vec![
                t.date.to_string(),
                name_or_id(&groups, &t.group_id),
                t.kind.to_string(),
                t.amount.to_string(),
                t.balance_after.to_string(),
                t.description.clone(),
            ]
        })
        .collect();
    let rows = Rows::render(
        args.format(),
        &transactions,
        &["Date", "Group", "Kind", "Amount", "Balance", "Description"],
        cells,
    )?;
    Ok(Out::new(plural(transactions.len(), "transaction"), rows))
}

/// Replays every group's transactions and reports savings records that disagree.
pub async fn savings_audit(config: Config) -> Result<Out<Vec<SavingsMismatch>>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let data = config
        .db()
        .snapshot()
        .await
        .pub_result(ErrorType::Database)?;
    let mismatches = ledger::audit(&data).pub_result(ErrorType::Database)?;
    if mismatches.is_empty() {
        return Ok(Out::new(
            format!(
                "All {} agree with the transaction history",
                plural(data.savings.len(), "savings account")
            ),
            mismatches,
        ));
    }
    for m in &mismatches {
        let show = |s: &Option<crate::model::SavingsRecord>| match s {
            Some(s) => s.balance.to_string(),
            None => String::from("no record"),
        };
        info!(
            "{}: stored {}, expected {}",
            data.group_name(&m.group_id),
            show(&m.actual),
            show(&m.expected)
        );
    }
    Ok(Out::new(
        format!(
            "{} disagree with the transaction history",
            plural(mismatches.len(), "savings account")
        ),
        mismatches,
    ))
}
