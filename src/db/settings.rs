//! The single-row `app_settings` table and the data a new database starts with.

use super::prices::insert_price;
use super::Db;
use crate::model::{default_waste_prices, AppSettings, SettingsUpdates};
use crate::Result;
use anyhow::Context;
use sqlx::{Row, SqliteConnection};

impl Db {
    pub(crate) async fn get_settings(&self) -> Result<AppSettings> {
        let mut conn = self.pool.acquire().await?;
        get_settings(&mut conn).await
    }

    /// Applies `updates` and returns the resulting settings.
    pub(crate) async fn update_settings(&self, updates: SettingsUpdates) -> Result<AppSettings> {
        let mut tx = self.pool.begin().await?;
        let mut settings = get_settings(&mut tx).await?;
        settings.apply(updates);
        save_settings(&mut tx, &settings).await?;
        tx.commit().await.context("Unable to commit settings")?;
        Ok(settings)
    }

    /// Inserts the default price list and settings into a freshly migrated database.
    pub(super) async fn seed_defaults(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        seed_defaults(&mut tx).await?;
        tx.commit().await.context("Unable to commit default data")?;
        Ok(())
    }
}

pub(super) async fn seed_defaults(conn: &mut SqliteConnection) -> Result<()> {
    for price in default_waste_prices() {
        insert_price(conn, &price).await?;
    }
    save_settings(conn, &AppSettings::default()).await
}

/// Reads the settings row. A database without one yields the defaults.
pub(super) async fn get_settings(conn: &mut SqliteConnection) -> Result<AppSettings> {
    let row = sqlx::query(
        "SELECT auto_backup, notifications, email_reports, whatsapp_notifications, \
        data_retention_days, rw_name, contact_person, contact_phone, address \
        FROM app_settings WHERE id = 1",
    )
    .fetch_optional(&mut *conn)
    .await
    .context("Unable to read settings")?;
    let Some(row) = row else {
        return Ok(AppSettings::default());
    };
    let retention: i64 = row.try_get("data_retention_days")?;
    Ok(AppSettings {
        auto_backup: row.try_get("auto_backup")?,
        notifications: row.try_get("notifications")?,
        email_reports: row.try_get("email_reports")?,
        whatsapp_notifications: row.try_get("whatsapp_notifications")?,
        data_retention_days: u32::try_from(retention)
            .context("Invalid data retention in database")?,
        rw_name: row.try_get("rw_name")?,
        contact_person: row.try_get("contact_person")?,
        contact_phone: row.try_get("contact_phone")?,
        address: row.try_get("address")?,
    })
}

pub(super) async fn save_settings(conn: &mut SqliteConnection, s: &AppSettings) -> Result<()> {
    sqlx::query(
        "INSERT INTO app_settings (id, auto_backup, notifications, email_reports, \
        whatsapp_notifications, data_retention_days, rw_name, contact_person, contact_phone, \
        address) VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
        ON CONFLICT (id) DO UPDATE SET auto_backup = excluded.auto_backup, \
        notifications = excluded.notifications, email_reports = excluded.email_reports, \
        whatsapp_notifications = excluded.whatsapp_notifications, \
        data_retention_days = excluded.data_retention_days, rw_name = excluded.rw_name, \
        contact_person = excluded.contact_person, contact_phone = excluded.contact_phone, \
        address = excluded.address",
    )
    .bind(s.auto_backup)
    .bind(s.notifications)
    .bind(s.email_reports)
    .bind(s.whatsapp_notifications)
    .bind(i64::from(s.data_retention_days))
    .bind(&s.rw_name)
    .bind(&s.contact_person)
    .bind(&s.contact_phone)
    .bind(&s.address)
    .execute(&mut *conn)
    .await
    .context("Unable to save settings")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_defaults_then_update() {
        let env = TestEnv::new().await;
        let db = env.config().db();
        assert_eq!(db.get_settings().await.unwrap(), AppSettings::default());

        let updated = db
            .update_settings(SettingsUpdates {
                rw_name: Some("RW 07".to_string()),
                auto_backup: Some(false),
                data_retention_days: Some(30),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.rw_name, "RW 07");
        assert_eq!(db.get_settings().await.unwrap(), updated);
        assert!(!db.get_settings().await.unwrap().auto_backup);
    }
}
