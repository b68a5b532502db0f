use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member group ("RT"), the unit of account for deposits and savings.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    /// Stable identifier. Deposits, savings and transactions refer to the group by this value.
    pub id: String,
    /// Display name such as "RT 01". Unique, ignoring case.
    pub name: String,
    /// The person responsible for the group.
    #[serde(default)]
    pub leader: String,
    /// Number of households in the group, if known.
    #[serde(default)]
    pub households: Option<u32>,
    #[serde(default)]
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Changes to apply to an existing group. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupUpdates {
    pub name: Option<String>,
    pub leader: Option<String>,
    pub households: Option<u32>,
    pub address: Option<String>,
}

impl Group {
    pub(crate) fn apply(&mut self, updates: GroupUpdates) {
        if let Some(name) = updates.name {
            self.name = name;
        }
        if let Some(leader) = updates.leader {
            self.leader = leader;
        }
        if let Some(households) = updates.households {
            self.households = Some(households);
        }
        if let Some(address) = updates.address {
            self.address = address;
        }
    }
}
