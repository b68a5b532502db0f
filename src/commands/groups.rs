//! Group (RT) command handlers.

use crate::args::GroupAddArgs;
use crate::commands::{plural, OutputFormat, Out, Rows};
use crate::db::GroupWithBalance;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Group, GroupUpdates};
use crate::{auth, utils, Config, Error, Result};
use tracing::debug;

/// Adds a group. Any logged-in user may do this.
pub async fn group_add(config: Config, args: GroupAddArgs) -> Result<Out<Group>> {
    let user = auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let group = Group {
        id: utils::generate_id(),
        name: args.name().trim().to_string(),
        leader: args.leader().trim().to_string(),
        households: args.households(),
        address: args.address().trim().to_string(),
        created_at: utils::now(),
    };
    config
        .db()
        .insert_group(&group)
        .await
        .pub_result(ErrorType::Database)?;
    debug!("{} added group {}", user.username, group.id);
    Ok(Out::new(format!("Added group '{}'", group.name), group))
}

/// Changes a group's name or details. The group is found by id or name.
pub async fn group_update(
    config: Config,
    group: &str,
    updates: GroupUpdates,
) -> Result<Out<Group>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let existing = find_group(&config, group).await?;
    let updated = config
        .db()
        .update_group(&existing.id, updates)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(format!("Updated group '{}'", updated.name), updated))
}

/// Deletes a group that has no deposits or transactions. Admin only.
pub async fn group_delete(config: Config, group: &str) -> Result<Out<Group>> {
    auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let existing = find_group(&config, group).await?;
    config
        .db()
        .delete_group(&existing.id)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Deleted group '{}'", existing.name),
        existing,
    ))
}

/// Lists all groups by name with their savings balance.
pub async fn group_list(config: Config, format: OutputFormat) -> Result<Out<Rows>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let groups: Vec<GroupWithBalance> = config
        .db()
        .list_groups()
        .await
        .pub_result(ErrorType::Database)?;
    let cells = groups
        .iter()
        .map(|g| {
            vec![
                g.group.name.clone(),
                g.group.leader.clone(),
                g.group
                    .households
                    .map(|h| h.to_string())
                    .unwrap_or_default(),
                g.balance.to_string(),
                g.group.id.clone(),
            ]
        })
        .collect();
    let rows = Rows::render(
        format,
        &groups,
        &["Name", "Leader", "Households", "Balance", "Id"],
        cells,
    )?;
    Ok(Out::new(plural(groups.len(), "group"), rows))
}

/// Resolves a group by id or name, or fails with a `Request` error.
pub(super) async fn find_group(config: &Config, group: &str) -> Result<Group> {
    config
        .db()
        .find_group(group)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| Error::request(format!("Group '{group}' not found")).into())
}
