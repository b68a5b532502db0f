use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{AppSettings, SettingsUpdates};
use crate::{auth, utils, Config, Error, Result};

/// Shows the waste bank settings.
pub async fn settings_show(config: Config) -> Result<Out<AppSettings>> {
    auth::current_user(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    let settings = config
        .db()
        .get_settings()
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(describe(&settings), settings))
}

/// Changes the given settings and leaves the others alone. Admin only.
pub async fn settings_set(config: Config, updates: SettingsUpdates) -> Result<Out<AppSettings>> {
    auth::require_admin(&config)
        .await
        .pub_result(ErrorType::Auth)?;
    if updates == SettingsUpdates::default() {
        return Err(Error::request("Nothing to change: pass at least one setting").into());
    }
    let settings = config
        .db()
        .update_settings(updates)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(Out::new(
        format!("Settings saved\n{}", describe(&settings)),
        settings,
    ))
}

fn describe(s: &AppSettings) -> String {
    let yes_no = |b: bool| String::from(if b { "yes" } else { "no" });
    utils::markdown_table(
        &["Setting", "Value"],
        vec![
            vec!["RW name".to_string(), s.rw_name.clone()],
            vec!["Contact person".to_string(), s.contact_person.clone()],
            vec!["Contact phone".to_string(), s.contact_phone.clone()],
            vec!["Address".to_string(), s.address.clone()],
            vec!["Automatic backups".to_string(), yes_no(s.auto_backup)],
            vec!["Notifications".to_string(), yes_no(s.notifications)],
            vec!["Email reports".to_string(), yes_no(s.email_reports)],
            vec![
                "WhatsApp notifications".to_string(),
                yes_no(s.whatsapp_notifications),
            ],
            vec![
                "Data retention (days)".to_string(),
                s.data_retention_days.to_string(),
            ],
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_set_only_changes_given_fields() {
        let env = TestEnv::new().await;
        let out = settings_set(
            env.config().clone(),
            SettingsUpdates {
                rw_name: Some("RW 07 Sukamaju".to_string()),
                email_reports: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let saved = out.structure().unwrap();
        assert_eq!(saved.rw_name, "RW 07 Sukamaju");
        assert!(saved.email_reports);
        assert_eq!(saved.data_retention_days, AppSettings::default().data_retention_days);

        let shown = settings_show(env.config().clone()).await.unwrap();
        assert_eq!(shown.structure(), Some(saved));
        assert!(shown.message().contains("| RW name | RW 07 Sukamaju |"));
    }

    #[tokio::test]
    async fn test_operator_can_read_but_not_write() {
        let env = TestEnv::new().await;
        env.login_operator("budi").await;
        settings_show(env.config().clone()).await.unwrap();
        let err = settings_set(
            env.config().clone(),
            SettingsUpdates {
                auto_backup: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Auth));
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let env = TestEnv::new().await;
        let err = settings_set(env.config().clone(), SettingsUpdates::default())
            .await
            .unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Request));
    }
}
