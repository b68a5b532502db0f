//! User accounts and login sessions.

use super::{is_unique_violation, parse_ts, ts, Db};
use crate::model::{Role, User};
use crate::{Error, Result};
use anyhow::Context;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::str::FromStr;

const USER_COLUMNS: &str = "id, username, name, role, created_at";

/// A user row ready to be written: the account plus an already-hashed password.
#[derive(Debug, Clone)]
pub(crate) struct UserRow<'a> {
    pub(crate) user: &'a User,
    /// `None` keeps the stored hash when updating.
    pub(crate) password_hash: Option<&'a str>,
}

impl Db {
    pub(crate) async fn insert_user(&self, user: &User, password_hash: &str) -> Result<()> {
        validate_username(&user.username)?;
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, name, role, created_at) \
            VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(password_hash)
        .bind(&user.name)
        .bind(user.role.to_string())
        .bind(ts(&user.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_username(e, &user.username))?;
        Ok(())
    }

    /// Looks up a user by username (ignoring case) together with the stored password hash.
    pub(crate) async fn get_user_by_username(&self, username: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ? COLLATE NOCASE"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Unable to query user")?;
        match row {
            None => Ok(None),
            Some(row) => {
                let hash: String = row.try_get("password_hash")?;
                Ok(Some((user_from_row(&row)?, hash)))
            }
        }
    }

    pub(crate) async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        get_user(&mut conn, id).await
    }

    /// Finds a user by id, or by username ignoring case.
    pub(crate) async fn find_user(&self, id_or_username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? OR username = ? COLLATE NOCASE \
            ORDER BY id = ? DESC LIMIT 1"
        ))
        .bind(id_or_username)
        .bind(id_or_username)
        .bind(id_or_username)
        .fetch_optional(&self.pool)
        .await
        .context("Unable to query user")?;
        row.as_ref().map(user_from_row).transpose()
    }

    /// All users ordered by username. Password hashes are not read.
    pub(crate) async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Unable to list users")?;
        rows.iter().map(user_from_row).collect()
    }

    /// Writes the changed account. Demoting the last admin is rejected.
    pub(crate) async fn update_user(&self, row: UserRow<'_>) -> Result<()> {
        let user = row.user;
        validate_username(&user.username)?;
        let mut tx = self.pool.begin().await?;
        let existing = get_user(&mut tx, &user.id)
            .await?
            .ok_or_else(|| Error::request(format!("User '{}' not found", user.id)))?;
        if existing.is_admin() && !user.is_admin() && count_admins(&mut tx).await? <= 1 {
            return Err(Error::request("Cannot demote the last admin").into());
        }
        sqlx::query(
            "UPDATE users SET username = ?, name = ?, role = ?, \
            password_hash = COALESCE(?, password_hash) WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(user.role.to_string())
        .bind(row.password_hash)
        .bind(&user.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_username(e, &user.username))?;
        tx.commit().await.context("Unable to commit user update")?;
        Ok(())
    }

    /// Deletes a user and their sessions. Deleting the last admin is rejected.
    pub(crate) async fn delete_user(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let user = get_user(&mut tx, id)
            .await?
            .ok_or_else(|| Error::request(format!("User '{id}' not found")))?;
        if user.is_admin() && count_admins(&mut tx).await? <= 1 {
            return Err(Error::request("Cannot delete the last admin").into());
        }
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Unable to delete user")?;
        tx.commit().await.context("Unable to commit user deletion")?;
        Ok(())
    }

    pub(crate) async fn count_users(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Unable to count users")?;
        Ok(count)
    }

    pub(crate) async fn insert_session(&self, token: &str, user_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(ts(&crate::utils::now()))
            .execute(&self.pool)
            .await
            .context("Unable to create session")?;
        Ok(())
    }

    /// The user a session token belongs to, if the session still exists.
    pub(crate) async fn session_user(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT u.id, u.username, u.name, u.role, u.created_at \
            FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Unable to query session")?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub(crate) async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .context("Unable to delete session")?;
        Ok(())
    }
}

fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() || username.chars().any(char::is_whitespace) {
        return Err(Error::request(format!(
            "Invalid username '{username}': it must be non-empty and contain no spaces"
        ))
        .into());
    }
    Ok(())
}

fn duplicate_username(e: sqlx::Error, username: &str) -> anyhow::Error {
    if is_unique_violation(&e) {
        Error::request(format!("The username '{username}' is already taken")).into()
    } else {
        anyhow::Error::new(e).context("Unable to write user")
    }
}

async fn get_user(conn: &mut SqliteConnection, id: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Unable to query user")?;
    row.as_ref().map(user_from_row).transpose()
}

async fn count_admins(conn: &mut SqliteConnection) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&mut *conn)
        .await
        .context("Unable to count admins")?;
    Ok(count)
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        role: Role::from_str(&role).with_context(|| format!("Invalid role '{role}' in database"))?,
        created_at: parse_ts(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use crate::ErrorType;

    fn user(username: &str, role: Role) -> User {
        User {
            id: crate::utils::generate_id(),
            username: username.to_string(),
            name: format!("{username} name"),
            role,
            created_at: crate::utils::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let env = TestEnv::new().await;
        let db = env.config().db();
        db.insert_user(&user("siti", Role::Operator), "h1").await.unwrap();
        let err = db
            .insert_user(&user("SITI", Role::Operator), "h2")
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
        assert!(err.to_string().contains("already taken"));
    }

    #[tokio::test]
    async fn test_lookup_returns_hash() {
        let env = TestEnv::new().await;
        let db = env.config().db();
        let u = user("joko", Role::Operator);
        db.insert_user(&u, "the-hash").await.unwrap();
        let (found, hash) = db.get_user_by_username("Joko").await.unwrap().unwrap();
        assert_eq!(found, u);
        assert_eq!(hash, "the-hash");
        assert!(db.get_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_admin_is_protected() {
        let env = TestEnv::new().await;
        let db = env.config().db();
        let admin = env.admin().clone();
        assert!(db.delete_user(&admin.id).await.is_err());

        let mut demoted = admin.clone();
        demoted.role = Role::Operator;
        let err = db
            .update_user(UserRow {
                user: &demoted,
                password_hash: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("last admin"));
    }

    #[tokio::test]
    async fn test_sessions() {
        let env = TestEnv::new().await;
        let db = env.config().db();
        let u = user("ani", Role::Operator);
        db.insert_user(&u, "h").await.unwrap();
        db.insert_session("tok", &u.id).await.unwrap();
        assert_eq!(db.session_user("tok").await.unwrap(), Some(u.clone()));
        db.delete_session("tok").await.unwrap();
        assert_eq!(db.session_user("tok").await.unwrap(), None);

        db.insert_session("tok2", &u.id).await.unwrap();
        db.delete_user(&u.id).await.unwrap();
        assert_eq!(db.session_user("tok2").await.unwrap(), None);
    }
}
