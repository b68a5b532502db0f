//! User account command handlers. All of them are reserved for admins.

use crate::args::UserAddArgs;
use crate::commands::{plural, OutputFormat, Out, Rows};
use crate::error::{ErrorType, IntoResult};
use crate::model::{User, UserUpdates};
use crate::{auth, Config, Error, Result};
use tracing::info;

/// Creates a user account. Usernames are unique ignoring case.
pub async fn user_add(config: Config, args: UserAddArgs) -> Result<Out<User>> {
    let admin = auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let user = auth::create_user(
        &config,
        args.username(),
        args.name(),
        args.role(),
        args.password(),
    )
    .await
    .pub_result(ErrorType::Database)?;
    info!("{} created {} account '{}'", admin.username, user.role, user.username);
    Ok(Out::new(format!("Added user '{}'", user.username), user))
}

/// Changes a user's username, name, role or password. The last admin cannot be demoted.
pub async fn user_update(config: Config, user: &str, updates: UserUpdates) -> Result<Out<User>> {
    auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let existing = find_user(&config, user).await?;
    let updated = auth::update_user(&config, &existing.id, updates)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Updated user '{}'", updated.username),
        updated,
    ))
}

/// Deletes a user account. Admins cannot delete themselves and the last admin cannot be deleted.
pub async fn user_delete(config: Config, user: &str) -> Result<Out<User>> {
    let admin = auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let existing = find_user(&config, user).await?;
    if existing.id == admin.id {
        return Err(Error::request("You cannot delete your own account").into());
    }
    config
        .db()
        .delete_user(&existing.id)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Deleted user '{}'", existing.username),
        existing,
    ))
}

/// Lists user accounts by username. Password hashes are never included.
pub async fn user_list(config: Config, format: OutputFormat) -> Result<Out<Rows>> {
    auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let users = config
        .db()
        .list_users()
        .await
        .pub_result(ErrorType::Database)?;
    let cells = users
        .iter()
        .map(|u| {
            vec![
                u.username.clone(),
                u.name.clone(),
                u.role.to_string(),
                u.created_at.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    let rows = Rows::render(
        format,
        &users,
        &["Username", "Name", "Role", "Created"],
        cells,
    )?;
    Ok(Out::new(plural(users.len(), "user"), rows))
}

async fn find_user(config: &Config, user: &str) -> Result<User> {
    config
        .db()
        .find_user(user)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| Error::request(format!("User '{user}' not found")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::test::{TestEnv, ADMIN_USERNAME};

    fn add_args(username: &str, role: Role) -> UserAddArgs {
        UserAddArgs::new(username, format!("Nama {username}"), role, "sandi123")
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let env = TestEnv::new().await;
        user_add(env.config().clone(), add_args("sari", Role::Operator))
            .await
            .unwrap();
        let out = user_list(env.config().clone(), OutputFormat::Json)
            .await
            .unwrap();
        assert_eq!(out.message(), "2 users");
        let Some(Rows::Json(json)) = out.structure() else {
            panic!("expected json rows");
        };
        assert_eq!(json[1]["username"], "sari");
        assert_eq!(json[1]["role"], "operator");
        assert!(!json.to_string().contains("argon2"));
        assert!(!json.to_string().contains("sandi123"));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let env = TestEnv::new().await;
        let err = user_add(env.config().clone(), add_args("ADMIN", Role::Operator))
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));

        user_add(env.config().clone(), add_args("sari", Role::Operator))
            .await
            .unwrap();
        let rename = UserUpdates {
            username: Some(ADMIN_USERNAME.to_string()),
            ..Default::default()
        };
        let err = user_update(env.config().clone(), "sari", rename)
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
    }

    #[tokio::test]
    async fn test_cannot_delete_self_or_last_admin() {
        let env = TestEnv::new().await;
        let err = user_delete(env.config().clone(), ADMIN_USERNAME)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "You cannot delete your own account");

        let demote = UserUpdates {
            role: Some(Role::Operator),
            ..Default::default()
        };
        let err = user_update(env.config().clone(), ADMIN_USERNAME, demote)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot demote the last admin");

        // with a second admin the first one can go
        user_add(env.config().clone(), add_args("kedua", Role::Admin))
            .await
            .unwrap();
        auth::login(env.config(), "kedua", "sandi123").await.unwrap();
        user_delete(env.config().clone(), ADMIN_USERNAME)
            .await
            .unwrap();
        let err = user_delete(env.config().clone(), "kedua").await.unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
    }

    #[tokio::test]
    async fn test_operator_cannot_manage_users() {
        let env = TestEnv::new().await;
        env.login_operator("budi").await;
        let err = user_list(env.config().clone(), OutputFormat::Table)
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Auth));
        let err = user_add(env.config().clone(), add_args("x", Role::Admin))
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Auth));
    }
}
