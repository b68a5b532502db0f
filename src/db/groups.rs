//! Group (RT) rows.

use super::{is_unique_violation, parse_amount, parse_ts, ts, Db};
use crate::model::{Amount, Group, GroupUpdates};
use crate::{Error, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// A group together with its current savings balance (zero before the first deposit).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupWithBalance {
    #[serde(flatten)]
    pub group: Group,
    pub balance: Amount,
}

const GROUP_COLUMNS: &str = "id, name, leader, households, address, created_at";

impl Db {
    pub(crate) async fn insert_group(&self, group: &Group) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        insert_group(&mut conn, group).await
    }

    pub(crate) async fn get_group(&self, id: &str) -> Result<Option<Group>> {
        let mut conn = self.pool.acquire().await?;
        get_group(&mut conn, id).await
    }

    /// Finds a group by id, or by name ignoring case.
    pub(crate) async fn find_group(&self, id_or_name: &str) -> Result<Option<Group>> {
        let row = sqlx::query(&format!(
            "SELECT {GROUP_COLUMNS} FROM rt_groups WHERE id = ? OR name = ? COLLATE NOCASE \
            ORDER BY id = ? DESC LIMIT 1"
        ))
        .bind(id_or_name)
        .bind(id_or_name)
        .bind(id_or_name)
        .fetch_optional(&self.pool)
        .await
        .context("Unable to query group")?;
        row.as_ref().map(group_from_row).transpose()
    }

    /// Applies `updates` to the group with `id` and returns the updated group.
    pub(crate) async fn update_group(&self, id: &str, updates: GroupUpdates) -> Result<Group> {
        let mut tx = self.pool.begin().await?;
        let mut group = get_group(&mut tx, id)
            .await?
            .ok_or_else(|| Error::request(format!("Group '{id}' not found")))?;
        group.apply(updates);
        validate_name(&group.name)?;
        sqlx::query(
            "UPDATE rt_groups SET name = ?, leader = ?, households = ?, address = ? WHERE id = ?",
        )
        .bind(&group.name)
        .bind(&group.leader)
        .bind(group.households.map(i64::from))
        .bind(&group.address)
        .bind(&group.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::request(format!("A group named '{}' already exists", group.name)).into()
            } else {
                anyhow::Error::new(e).context("Unable to update group")
            }
        })?;
        tx.commit().await.context("Unable to commit group update")?;
        Ok(group)
    }

    /// Deletes a group. Groups with deposits or transactions cannot be deleted.
    pub(crate) async fn delete_group(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let group = get_group(&mut tx, id)
            .await?
            .ok_or_else(|| Error::request(format!("Group '{id}' not found")))?;
        let (deposits,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM deposits WHERE group_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let (transactions,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE group_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if deposits > 0 || transactions > 0 {
            return Err(Error::request(format!(
                "Cannot delete group '{}': it has {deposits} deposit(s) and {transactions} \
                transaction(s) on record",
                group.name
            ))
            .into());
        }
        sqlx::query("DELETE FROM savings WHERE group_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM rt_groups WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Unable to delete group")?;
        tx.commit().await.context("Unable to commit group deletion")?;
        Ok(())
    }

    /// All groups ordered by name, with their balances.
    pub(crate) async fn list_groups(&self) -> Result<Vec<GroupWithBalance>> {
        let rows = sqlx::query(
            "SELECT g.id, g.name, g.leader, g.households, g.address, g.created_at, s.balance \
            FROM rt_groups g LEFT JOIN savings s ON s.group_id = g.id \
            ORDER BY g.name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await
        .context("Unable to list groups")?;
        rows.iter()
            .map(|row| -> Result<GroupWithBalance> {
                let balance: Option<String> = row.try_get("balance")?;
                Ok(GroupWithBalance {
                    group: group_from_row(row)?,
                    balance: match balance {
                        Some(b) => parse_amount(&b)?,
                        None => Amount::ZERO,
                    },
                })
            })
            .collect()
    }
}

pub(super) fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::request("A group name cannot be empty").into());
    }
    Ok(())
}

pub(super) async fn insert_group(conn: &mut SqliteConnection, group: &Group) -> Result<()> {
    validate_name(&group.name)?;
    sqlx::query(
        "INSERT INTO rt_groups (id, name, leader, households, address, created_at) \
        VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&group.id)
    .bind(&group.name)
    .bind(&group.leader)
    .bind(group.households.map(i64::from))
    .bind(&group.address)
    .bind(ts(&group.created_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::request(format!("A group named '{}' already exists", group.name)).into()
        } else {
            anyhow::Error::new(e).context("Unable to insert group")
        }
    })?;
    Ok(())
}

pub(super) async fn get_group(conn: &mut SqliteConnection, id: &str) -> Result<Option<Group>> {
    let row = sqlx::query(&format!("SELECT {GROUP_COLUMNS} FROM rt_groups WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Unable to query group")?;
    row.as_ref().map(group_from_row).transpose()
}

pub(super) async fn all_groups(conn: &mut SqliteConnection) -> Result<Vec<Group>> {
    let rows = sqlx::query(&format!(
        "SELECT {GROUP_COLUMNS} FROM rt_groups ORDER BY rowid"
    ))
    .fetch_all(&mut *conn)
    .await
    .context("Unable to read groups")?;
    rows.iter().map(group_from_row).collect()
}

fn group_from_row(row: &SqliteRow) -> Result<Group> {
    let households: Option<i64> = row.try_get("households")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Group {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        leader: row.try_get("leader")?,
        households: households
            .map(u32::try_from)
            .transpose()
            .context("Invalid household count in database")?,
        address: row.try_get("address")?,
        created_at: parse_ts(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use crate::ErrorType;

    fn group(name: &str) -> Group {
        Group {
            id: crate::utils::generate_id(),
            name: name.to_string(),
            leader: "Pak Budi".to_string(),
            households: Some(40),
            address: "Jl. Melati".to_string(),
            created_at: crate::utils::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let g = group("RT 01");
        db.insert_group(&g).await.unwrap();
        assert_eq!(db.get_group(&g.id).await.unwrap(), Some(g.clone()));
        assert_eq!(db.find_group("rt 01").await.unwrap(), Some(g.clone()));
        assert_eq!(db.find_group(&g.id).await.unwrap(), Some(g));
        assert_eq!(db.find_group("RT 99").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_ignoring_case() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        db.insert_group(&group("RT 01")).await.unwrap();
        let err = db.insert_group(&group("rt 01")).await.unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_update_and_list() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let g = group("RT 02");
        db.insert_group(&g).await.unwrap();
        let updated = db
            .update_group(
                &g.id,
                GroupUpdates {
                    name: Some("RT 02 Baru".to_string()),
                    households: Some(42),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "RT 02 Baru");
        assert_eq!(updated.households, Some(42));
        assert_eq!(updated.leader, "Pak Budi");

        let listed = db.list_groups().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].group, updated);
        assert_eq!(listed[0].balance, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_delete_unused_group() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let g = group("RT 03");
        db.insert_group(&g).await.unwrap();
        db.delete_group(&g.id).await.unwrap();
        assert_eq!(db.get_group(&g.id).await.unwrap(), None);
        assert!(db.delete_group(&g.id).await.is_err());
    }
}
