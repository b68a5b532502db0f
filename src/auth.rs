//! Passwords, sessions and role checks.
//!
//! Passwords are stored as argon2 PHC strings. Logging in creates a row in the `sessions` table
//! and writes its token to the session file (`$BANKSAMPAH_HOME/.session` by default). Every
//! command that reads or writes bookkeeping data resolves the acting user from that file.

use crate::db::UserRow;
use crate::model::{Role, User, UserUpdates};
use crate::{utils, Config, Error, Result};
use anyhow::{anyhow, Context};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
#[cfg(test)]
use argon2::{Algorithm, Params, Version};
use std::path::Path;
use tracing::{debug, info};

const BAD_CREDENTIALS: &str = "Invalid username or password";

/// Hashes a plaintext password into an argon2 PHC string.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(Error::request("The password cannot be empty").into());
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Unable to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// True when `password` matches the stored `hash`.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow!("Invalid password hash in database: {e}"))?;
    Ok(hasher()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(not(test))]
fn hasher() -> Argon2<'static> {
    Argon2::default()
}

// Low-cost parameters for tests
#[cfg(test)]
fn hasher() -> Argon2<'static> {
    let params = Params::new(1024, 1, 1, None).unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Checks the credentials, opens a session and saves its token to the session file.
///
/// An unknown username and a wrong password produce the same error.
pub(crate) async fn login(config: &Config, username: &str, password: &str) -> Result<User> {
    let db = config.db();
    let Some((user, hash)) = db.get_user_by_username(username).await? else {
        debug!("Login failed: no user named {username}");
        return Err(Error::auth(BAD_CREDENTIALS).into());
    };
    if !verify_password(password, &hash)? {
        debug!("Login failed: wrong password for {username}");
        return Err(Error::auth(BAD_CREDENTIALS).into());
    }

    // Replace any session this data directory already had
    let session_path = config.session_path();
    if let Some(old) = read_token(&session_path).await? {
        db.delete_session(&old).await?;
    }
    let token = utils::generate_id();
    db.insert_session(&token, &user.id).await?;
    write_token(&session_path, &token).await?;
    info!("Logged in as {} ({})", user.username, user.role);
    Ok(user)
}

/// Ends the current session. Returns the user that was logged in, if any.
pub(crate) async fn logout(config: &Config) -> Result<Option<User>> {
    let session_path = config.session_path();
    let Some(token) = read_token(&session_path).await? else {
        return Ok(None);
    };
    let user = config.db().session_user(&token).await?;
    config.db().delete_session(&token).await?;
    utils::remove(&session_path).await?;
    Ok(user)
}

/// The logged-in user, or an `Auth` error when there is no valid session.
pub(crate) async fn current_user(config: &Config) -> Result<User> {
    let not_logged_in = || Error::auth("Not logged in. Run 'banksampah login' first");
    let token = read_token(&config.session_path())
        .await?
        .ok_or_else(not_logged_in)?;
    let user = config
        .db()
        .session_user(&token)
        .await?
        .ok_or_else(not_logged_in)?;
    Ok(user)
}

/// The logged-in user, who must be an admin.
pub(crate) async fn require_admin(config: &Config) -> Result<User> {
    let user = current_user(config).await?;
    ensure_admin(&user)?;
    Ok(user)
}

pub(crate) fn ensure_admin(user: &User) -> Result<()> {
    if !user.is_admin() {
        return Err(Error::auth(format!(
            "Permission denied: '{}' is an operator and this action needs an admin",
            user.username
        ))
        .into());
    }
    Ok(())
}

/// Creates an account. Used by `init` for the first admin and by `user add`.
pub(crate) async fn create_user(
    config: &Config,
    username: &str,
    name: &str,
    role: Role,
    password: &str,
) -> Result<User> {
    if name.trim().is_empty() {
        return Err(Error::request("A user needs a name").into());
    }
    let user = User {
        id: utils::generate_id(),
        username: username.trim().to_string(),
        name: name.trim().to_string(),
        role,
        created_at: utils::now(),
    };
    let hash = hash_password(password)?;
    config.db().insert_user(&user, &hash).await?;
    Ok(user)
}

/// Applies `updates` to the user with `id`, hashing a new password if one is given.
pub(crate) async fn update_user(config: &Config, id: &str, updates: UserUpdates) -> Result<User> {
    let db = config.db();
    let mut user = db
        .get_user(id)
        .await?
        .ok_or_else(|| Error::request(format!("User '{id}' not found")))?;
    if let Some(username) = updates.username {
        user.username = username.trim().to_string();
    }
    if let Some(name) = updates.name {
        user.name = name.trim().to_string();
    }
    if let Some(role) = updates.role {
        user.role = role;
    }
    let hash = updates.password.as_deref().map(hash_password).transpose()?;
    db.update_user(UserRow {
        user: &user,
        password_hash: hash.as_deref(),
    })
    .await?;
    Ok(user)
}

async fn read_token(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let token = utils::read(path).await?.trim().to_string();
    Ok(if token.is_empty() { None } else { Some(token) })
}

async fn write_token(path: &Path, token: &str) -> Result<()> {
    utils::write(path, token).await?;

    // Set restrictive permissions on Unix-like systems
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, Permissions::from_mode(0o600))
            .context("Failed to set session file permissions")?;
    }
    Ok(())
}
