//! Login session command handlers.
//!
//! - `banksampah login` - Check credentials and store a session token
//! - `banksampah logout` - End the session
//! - `banksampah whoami` - Show the logged-in user

use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::User;
use crate::{auth, Config, Result};

/// Handles `banksampah login`. A session that already exists in this data directory is replaced.
pub async fn login(config: Config, username: &str, password: &str) -> Result<Out<User>> {
    let user = auth::login(&config, username, password)
        .await
        .pub_result(ErrorType::Auth)?;
    Ok(Out::new(
        format!("Logged in as {} ({})", user.name, user.role),
        user,
    ))
}

/// Handles `banksampah logout`. Logging out without a session is not an error.
pub async fn logout(config: Config) -> Result<Out<User>> {
    let user = auth::logout(&config).await.pub_result(ErrorType::Auth)?;
    Ok(match user {
        Some(user) => Out::new(format!("Logged out {}", user.username), user),
        None => "Not logged in".into(),
    })
}

/// Handles `banksampah whoami`.
pub async fn whoami(config: Config) -> Result<Out<User>> {
    let user = auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    Ok(Out::new(
        format!("{} ({}), role {}", user.username, user.name, user.role),
        user,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{TestEnv, ADMIN_USERNAME, OPERATOR_PASSWORD};
    use crate::Error;

    #[tokio::test]
    async fn test_login_switches_user() {
        let env = TestEnv::new().await;
        env.add_operator("budi").await;
        let out = login(env.config().clone(), "budi", OPERATOR_PASSWORD)
            .await
            .unwrap();
        assert_eq!(out.message(), "Logged in as Operator budi (operator)");

        let me = whoami(env.config().clone()).await.unwrap();
        assert_eq!(me.structure().unwrap().username, "budi");
    }

    #[tokio::test]
    async fn test_logout_then_whoami() {
        let env = TestEnv::new().await;
        let out = logout(env.config().clone()).await.unwrap();
        assert_eq!(out.structure().unwrap().username, ADMIN_USERNAME);

        let err = whoami(env.config().clone()).await.unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Auth));

        let again = logout(env.config().clone()).await.unwrap();
        assert!(again.structure().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let env = TestEnv::new().await;
        let err = login(env.config().clone(), ADMIN_USERNAME, "salah")
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Auth));
        assert_eq!(err.to_string(), "Invalid username or password");
    }
}
