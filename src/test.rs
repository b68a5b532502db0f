//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::model::{Group, Role, User};
use crate::{auth, utils, Config};
use tempfile::TempDir;

pub(crate) const ADMIN_USERNAME: &str = "admin";
pub(crate) const ADMIN_PASSWORD: &str = "admin123";
pub(crate) const OPERATOR_PASSWORD: &str = "operator123";

/// Test environment that sets up a banksampah home directory with Config, database and a
/// logged-in admin. Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
    admin: User,
}

impl TestEnv {
    /// Creates a data directory, an admin account and a session for that admin.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::create(temp_dir.path().join("banksampah"))
            .await
            .unwrap();
        let admin = auth::create_user(
            &config,
            ADMIN_USERNAME,
            "Pak Admin",
            Role::Admin,
            ADMIN_PASSWORD,
        )
        .await
        .unwrap();
        auth::login(&config, ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
            admin,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The admin created by `new`.
    pub fn admin(&self) -> &User {
        &self.admin
    }

    /// Inserts a group named `name` directly into the database.
    pub async fn add_group(&self, name: &str) -> Group {
        let group = Group {
            id: utils::generate_id(),
            name: name.to_string(),
            leader: format!("Ketua {name}"),
            households: None,
            address: String::new(),
            created_at: utils::now(),
        };
        self.config.db().insert_group(&group).await.unwrap();
        group
    }

    /// Creates an operator account with `OPERATOR_PASSWORD`. The admin stays logged in.
    pub async fn add_operator(&self, username: &str) -> User {
        auth::create_user(
            &self.config,
            username,
            &format!("Operator {username}"),
            Role::Operator,
            OPERATOR_PASSWORD,
        )
        .await
        .unwrap()
    }

    /// Creates an operator account and replaces the admin's session with the operator's.
    pub async fn login_operator(&self, username: &str) -> User {
        self.add_operator(username).await;
        auth::login(&self.config, username, OPERATOR_PASSWORD)
            .await
            .unwrap()
    }

    /// Logs the admin back in, replacing whichever session is current.
    pub async fn login_admin(&self) {
        auth::login(&self.config, ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .unwrap();
    }
}
