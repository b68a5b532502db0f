use crate::model::Amount;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Whether a transaction credits or debits a group's savings.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

serde_plain::derive_display_from_serialize!(TransactionKind);
serde_plain::derive_fromstr_from_deserialize!(TransactionKind);

/// One entry in the savings ledger.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub id: String,
    pub group_id: String,
    pub kind: TransactionKind,
    /// Always positive; `kind` gives the direction.
    pub amount: Amount,
    /// The group's balance immediately after this transaction.
    pub balance_after: Amount,
    #[serde(default)]
    pub description: String,
    /// The deposit that produced this transaction, for `deposit` transactions.
    #[serde(default)]
    pub deposit_id: Option<String>,
    /// Business date used for reporting.
    pub date: NaiveDate,
    /// Id of the user who recorded the transaction.
    #[serde(default)]
    pub recorded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// The signed effect of this transaction on the balance.
    pub fn signed_amount(&self) -> Amount {
        match self.kind {
            TransactionKind::Deposit => self.amount,
            TransactionKind::Withdrawal => -self.amount,
        }
    }
}
