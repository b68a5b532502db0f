use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Role, User};
use crate::{auth, Config, Error, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file with default settings
/// - Creates the database with the default waste price list
/// - Creates the first admin account and logs it in
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/banksampah`
/// - `username`, `name`, `password` - The first admin account.
///
/// # Errors
/// - Returns an error if the directory already holds a database or any file operation fails.
pub async fn init(home: &Path, username: &str, name: &str, password: &str) -> Result<Out<User>> {
    // Catch an unusable admin account before anything is written to disk
    if password.is_empty() || username.trim().is_empty() || name.trim().is_empty() {
        return Err(
            Error::request("The admin account needs a username, a name and a password").into(),
        );
    }
    let config = Config::create(home)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    let admin = auth::create_user(&config, username, name, Role::Admin, password)
        .await
        .pub_result(ErrorType::Request)?;
    auth::login(&config, username, password)
        .await
        .pub_result(ErrorType::Auth)?;
    Ok(Out::new(
        format!(
            "Created {} and logged in as admin '{}'",
            config.root().display(),
            admin.username
        ),
        admin,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_creates_admin_session() {
        let dir = tempfile::TempDir::new().unwrap();
        let home = dir.path().join("bank");
        let out = init(&home, "ketua", "Ketua RW", "rahasia").await.unwrap();
        let admin = out.structure().unwrap();
        assert!(admin.is_admin());

        let config = Config::load(&home).await.unwrap();
        assert_eq!(auth::current_user(&config).await.unwrap(), *admin);
        assert_eq!(config.db().list_prices().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        init(dir.path(), "admin", "Admin", "pw").await.unwrap();
        let err = init(dir.path(), "admin", "Admin", "pw").await.unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Config));
    }

    #[tokio::test]
    async fn test_init_needs_password() {
        let dir = tempfile::TempDir::new().unwrap();
        let home = dir.path().join("bank");
        let err = init(&home, "admin", "Admin", "").await.unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
        assert!(!home.exists());
    }
}
