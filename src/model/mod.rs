//! Types that represent the core data model, such as `Group`, `WasteDeposit` and `Transaction`.
mod amount;
mod group;
mod savings;
mod settings;
mod transaction;
mod user;
mod waste;
mod weight;

pub use amount::{Amount, AmountError};
pub use group::{Group, GroupUpdates};
pub use savings::SavingsRecord;
pub use settings::{AppSettings, SettingsUpdates};
pub use transaction::{Transaction, TransactionKind};
pub use user::{Role, User, UserUpdates};
pub use waste::{default_waste_prices, deposit_value, WasteDeposit, WastePrice};
pub use weight::{Weight, WeightError};

use serde::{Deserialize, Serialize};

/// Every bookkeeping record in a data directory. This is the content of a backup file and the
/// input to report calculations. Credentials are deliberately not part of it.
///
/// Records are kept in insertion order (oldest first).
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BankData {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub waste_prices: Vec<WastePrice>,
    #[serde(default)]
    pub waste_deposits: Vec<WasteDeposit>,
    #[serde(default)]
    pub savings: Vec<SavingsRecord>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub app_settings: AppSettings,
}

impl BankData {
    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn waste_price(&self, id: &str) -> Option<&WastePrice> {
        self.waste_prices.iter().find(|p| p.id == id)
    }

    /// The group's name, or its id when the group is unknown.
    pub fn group_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.group(id).map(|g| g.name.as_str()).unwrap_or(id)
    }

    /// The waste type's name, or its id when the type is unknown.
    pub fn waste_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.waste_price(id).map(|p| p.name.as_str()).unwrap_or(id)
    }
}
