use serde::{Deserialize, Serialize};

/// Organization details and preferences for the data directory.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct AppSettings {
    /// Save a rotating backup after every deposit and withdrawal.
    pub auto_backup: bool,
    pub notifications: bool,
    pub email_reports: bool,
    pub whatsapp_notifications: bool,
    pub data_retention_days: u32,
    /// Name of the RW (the community unit the groups belong to).
    pub rw_name: String,
    pub contact_person: String,
    pub contact_phone: String,
    pub address: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            auto_backup: true,
            notifications: true,
            email_reports: false,
            whatsapp_notifications: true,
            data_retention_days: 365,
            rw_name: String::new(),
            contact_person: String::new(),
            contact_phone: String::new(),
            address: String::new(),
        }
    }
}

/// Changes to apply to the settings. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SettingsUpdates {
    pub auto_backup: Option<bool>,
    pub notifications: Option<bool>,
    pub email_reports: Option<bool>,
    pub whatsapp_notifications: Option<bool>,
    pub data_retention_days: Option<u32>,
    pub rw_name: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
}

impl AppSettings {
    pub(crate) fn apply(&mut self, u: SettingsUpdates) {
        if let Some(v) = u.auto_backup {
            self.auto_backup = v;
        }
        if let Some(v) = u.notifications {
            self.notifications = v;
        }
        if let Some(v) = u.email_reports {
            self.email_reports = v;
        }
        if let Some(v) = u.whatsapp_notifications {
            self.whatsapp_notifications = v;
        }
        if let Some(v) = u.data_retention_days {
            self.data_retention_days = v;
        }
        if let Some(v) = u.rw_name {
            self.rw_name = v;
        }
        if let Some(v) = u.contact_person {
            self.contact_person = v;
        }
        if let Some(v) = u.contact_phone {
            self.contact_phone = v;
        }
        if let Some(v) = u.address {
            self.address = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let s: AppSettings = serde_json::from_str(r#"{"rw_name": "RW 05"}"#).unwrap();
        assert_eq!(s.rw_name, "RW 05");
        assert!(s.auto_backup);
        assert_eq!(s.data_retention_days, 365);
    }

    #[test]
    fn test_apply_updates() {
        let mut s = AppSettings::default();
        s.apply(SettingsUpdates {
            auto_backup: Some(false),
            contact_phone: Some("0812".to_string()),
            ..Default::default()
        });
        assert!(!s.auto_backup);
        assert_eq!(s.contact_phone, "0812");
        assert!(s.notifications);
    }
}
