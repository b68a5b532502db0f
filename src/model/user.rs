use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a user is allowed to do.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including user management, settings, restore and reset.
    Admin,
    /// Day-to-day bookkeeping: groups, deposits, withdrawals, reports and backups.
    #[default]
    Operator,
}

serde_plain::derive_display_from_serialize!(Role);
serde_plain::derive_fromstr_from_deserialize!(Role);

/// A user account. The password hash is never part of this type.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Changes to apply to an existing user. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct UserUpdates {
    pub username: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    /// A new plaintext password, hashed before it is stored.
    pub password: Option<String>,
}
