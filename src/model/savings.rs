use crate::model::Amount;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The savings account of a group. Created by the group's first deposit.
///
/// `balance` always equals `total_deposits - total_withdrawals`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SavingsRecord {
    pub group_id: String,
    pub balance: Amount,
    pub total_deposits: Amount,
    pub total_withdrawals: Amount,
    pub transaction_count: u64,
    /// Business date of the most recent deposit or withdrawal.
    pub last_transaction: NaiveDate,
}

impl SavingsRecord {
    /// A fresh record for a group's first deposit.
    pub(crate) fn opened_with(group_id: &str, amount: Amount, date: NaiveDate) -> Self {
        Self {
            group_id: group_id.to_string(),
            balance: amount,
            total_deposits: amount,
            total_withdrawals: Amount::ZERO,
            transaction_count: 1,
            last_transaction: date,
        }
    }

    /// Adds a deposit. The record is left unchanged when a total would overflow.
    pub(crate) fn credit(&mut self, amount: Amount, date: NaiveDate) -> Result<()> {
        let balance = self.balance.checked_add(amount);
        let total = self.total_deposits.checked_add(amount);
        let (Some(balance), Some(total)) = (balance, total) else {
            return Err(self.too_large(amount));
        };
        self.balance = balance;
        self.total_deposits = total;
        self.transaction_count += 1;
        self.last_transaction = date;
        Ok(())
    }

    /// Takes a withdrawal. The record is left unchanged when a total would overflow.
    pub(crate) fn debit(&mut self, amount: Amount, date: NaiveDate) -> Result<()> {
        let balance = self.balance.checked_sub(amount);
        let total = self.total_withdrawals.checked_add(amount);
        let (Some(balance), Some(total)) = (balance, total) else {
            return Err(self.too_large(amount));
        };
        self.balance = balance;
        self.total_withdrawals = total;
        self.transaction_count += 1;
        self.last_transaction = date;
        Ok(())
    }

    fn too_large(&self, amount: Amount) -> anyhow::Error {
        Error::request(format!(
            "Adding {amount} to the savings of group {} makes a total too large to record",
            self.group_id
        ))
        .into()
    }

    /// True when the stored balance agrees with the stored totals.
    pub fn is_consistent(&self) -> bool {
        self.total_deposits.checked_sub(self.total_withdrawals) == Some(self.balance)
            && !self.balance.is_negative()
    }
}
