//! Checks that the stored savings agree with the transaction history.
//!
//! The database keeps a running `SavingsRecord` per group so balances can be read without
//! replaying history. These functions replay the history anyway and compare, which is how a
//! restored backup is validated and how `savings audit` finds damaged records.

use crate::model::{deposit_value, Amount, BankData, SavingsRecord, Transaction, TransactionKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A group whose stored savings record disagrees with its transactions.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SavingsMismatch {
    pub group_id: String,
    /// The record rebuilt from transactions. `None` when the group has no transactions.
    pub expected: Option<SavingsRecord>,
    /// The stored record. `None` when the group has transactions but no record.
    pub actual: Option<SavingsRecord>,
}

/// Rebuilds every group's savings record by replaying its transactions in date order.
pub fn expected_savings(data: &BankData) -> Result<BTreeMap<String, SavingsRecord>> {
    let mut transactions: Vec<_> = data.transactions.iter().collect();
    transactions.sort_by_key(|t| (t.date, t.created_at));
    let mut savings: BTreeMap<String, SavingsRecord> = BTreeMap::new();
    for t in transactions {
        match savings.get_mut(&t.group_id) {
            Some(s) => match t.kind {
                TransactionKind::Deposit => s.credit(t.amount, t.date)?,
                TransactionKind::Withdrawal => s.debit(t.amount, t.date)?,
            },
            None => {
                let mut s = SavingsRecord::opened_with(&t.group_id, t.amount, t.date);
                if t.kind == TransactionKind::Withdrawal {
                    // only possible in damaged data
                    s.balance = -t.amount;
                    s.total_deposits = Amount::ZERO;
                    s.total_withdrawals = t.amount;
                }
                savings.insert(t.group_id.clone(), s);
            }
        }
    }
    Ok(savings)
}

/// Compares stored savings with the replayed transaction history.
pub fn audit(data: &BankData) -> Result<Vec<SavingsMismatch>> {
    let mut expected = expected_savings(data)?;
    let mut mismatches = Vec::new();
    for actual in &data.savings {
        let want = expected.remove(&actual.group_id);
        let matches = match &want {
            Some(want) => {
                want.balance == actual.balance
                    && want.total_deposits == actual.total_deposits
                    && want.total_withdrawals == actual.total_withdrawals
                    && want.transaction_count == actual.transaction_count
            }
            None => false,
        };
        if !matches {
            mismatches.push(SavingsMismatch {
                group_id: actual.group_id.clone(),
                expected: want,
                actual: Some(actual.clone()),
            });
        }
    }
    for (group_id, want) in expected {
        mismatches.push(SavingsMismatch {
            group_id,
            expected: Some(want),
            actual: None,
        });
    }
    Ok(mismatches)
}

/// Checks a record set before it replaces the store: ids and names are unique, every reference
/// points at an existing record, every deposit is credited by exactly one transaction of its
/// value, and every savings record agrees with the transactions.
///
/// Names are compared ignoring ASCII case, the same folding SQLite's `NOCASE` applies.
pub fn validate(data: &BankData) -> Result<()> {
    let group_ids = unique_ids("group", data.groups.iter().map(|g| g.id.as_str()))?;
    let price_ids = unique_ids("waste type", data.waste_prices.iter().map(|p| p.id.as_str()))?;
    let deposit_ids = unique_ids(
        "deposit",
        data.waste_deposits.iter().map(|d| d.id.as_str()),
    )?;
    unique_ids("transaction", data.transactions.iter().map(|t| t.id.as_str()))?;
    unique_ids("savings", data.savings.iter().map(|s| s.group_id.as_str()))?;
    let names: Vec<String> = data
        .groups
        .iter()
        .map(|g| g.name.to_ascii_lowercase())
        .collect();
    unique_ids("group name", names.iter().map(String::as_str))?;
    let names: Vec<String> = data
        .waste_prices
        .iter()
        .map(|p| p.name.to_ascii_lowercase())
        .collect();
    unique_ids("waste type name", names.iter().map(String::as_str))?;

    for d in &data.waste_deposits {
        if !group_ids.contains(d.group_id.as_str()) {
            return Err(invalid(format!(
                "deposit {} refers to unknown group {}",
                d.id, d.group_id
            )));
        }
        if !price_ids.contains(d.waste_type_id.as_str()) {
            return Err(invalid(format!(
                "deposit {} refers to unknown waste type {}",
                d.id, d.waste_type_id
            )));
        }
    }
    let mut credits: HashMap<&str, &Transaction> = HashMap::new();
    for t in &data.transactions {
        if !group_ids.contains(t.group_id.as_str()) {
            return Err(invalid(format!(
                "transaction {} refers to unknown group {}",
                t.id, t.group_id
            )));
        }
        if !t.amount.is_positive() {
            return Err(invalid(format!(
                "transaction {} has a non-positive amount {}",
                t.id, t.amount
            )));
        }
        match (t.kind, &t.deposit_id) {
            (TransactionKind::Deposit, Some(deposit_id)) => {
                if !deposit_ids.contains(deposit_id.as_str()) {
                    return Err(invalid(format!(
                        "transaction {} refers to unknown deposit {deposit_id}",
                        t.id
                    )));
                }
                if credits.insert(deposit_id.as_str(), t).is_some() {
                    return Err(invalid(format!(
                        "deposit {deposit_id} is credited more than once"
                    )));
                }
            }
            (TransactionKind::Deposit, None) => {
                return Err(invalid(format!(
                    "deposit transaction {} has no deposit",
                    t.id
                )));
            }
            (TransactionKind::Withdrawal, Some(deposit_id)) => {
                return Err(invalid(format!(
                    "withdrawal {} refers to deposit {deposit_id}",
                    t.id
                )));
            }
            (TransactionKind::Withdrawal, None) => {}
        }
    }
    for d in &data.waste_deposits {
        let Some(t) = credits.get(d.id.as_str()) else {
            return Err(invalid(format!(
                "deposit {} was never credited to savings",
                d.id
            )));
        };
        if t.amount != d.value || t.group_id != d.group_id {
            return Err(invalid(format!(
                "deposit {} of group {} is worth {} but transaction {} credits {} to group {}",
                d.id, d.group_id, d.value, t.id, t.amount, t.group_id
            )));
        }
        if deposit_value(d.weight_kg, d.price_per_kg).ok() != Some(d.value) {
            return Err(invalid(format!(
                "deposit {} of {} at {} is not worth {}",
                d.id, d.weight_kg, d.price_per_kg, d.value
            )));
        }
    }
    for s in &data.savings {
        if !group_ids.contains(s.group_id.as_str()) {
            return Err(invalid(format!(
                "savings record refers to unknown group {}",
                s.group_id
            )));
        }
        if !s.is_consistent() {
            return Err(invalid(format!(
                "savings of group {} do not add up: balance {} with deposits {} and \
                withdrawals {}",
                s.group_id, s.balance, s.total_deposits, s.total_withdrawals
            )));
        }
    }
    let mismatches = audit(data).map_err(|e| invalid(format!("{e:#}")))?;
    if let Some(m) = mismatches.first() {
        return Err(invalid(format!(
            "savings of group {} do not match its transactions",
            m.group_id
        )));
    }
    Ok(())
}

fn unique_ids<'a>(what: &str, ids: impl Iterator<Item = &'a str>) -> Result<HashSet<&'a str>> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate {what} '{id}'")));
        }
    }
    Ok(seen)
}

fn invalid(message: String) -> anyhow::Error {
    Error::backup(format!("Invalid backup file: {message}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Group, WasteDeposit, WastePrice, Weight};
    use crate::ErrorType;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn transaction(group_id: &str, kind: TransactionKind, amount: i64, d: u32) -> Transaction {
        Transaction {
            id: crate::utils::generate_id(),
            group_id: group_id.to_string(),
            kind,
            amount: Amount::rupiah(amount),
            balance_after: Amount::ZERO,
            description: String::new(),
            deposit_id: None,
            date: day(d),
            recorded_by: None,
            created_at: crate::utils::now(),
        }
    }

    /// A plastic weigh-in for g1 and the transaction that credits it.
    fn weigh_in(id: &str, kg: i64, d: u32) -> (WasteDeposit, Transaction) {
        let deposit = WasteDeposit {
            id: id.to_string(),
            group_id: "g1".to_string(),
            waste_type_id: "plastik".to_string(),
            weight_kg: Weight::kg(kg),
            price_per_kg: Amount::rupiah(5_000),
            value: Amount::rupiah(kg * 5_000),
            date: day(d),
            notes: String::new(),
            recorded_by: None,
            created_at: crate::utils::now(),
        };
        let mut credit = transaction("g1", TransactionKind::Deposit, kg * 5_000, d);
        credit.deposit_id = Some(id.to_string());
        (deposit, credit)
    }

    fn group(id: &str, name: &str) -> Group {
        Group {
            id: id.to_string(),
            name: name.to_string(),
            leader: String::new(),
            households: None,
            address: String::new(),
            created_at: crate::utils::now(),
        }
    }

    fn data() -> BankData {
        let (first, first_credit) = weigh_in("d1", 10, 1);
        let (second, second_credit) = weigh_in("d2", 1, 3);
        let transactions = vec![
            first_credit,
            transaction("g1", TransactionKind::Withdrawal, 20_000, 2),
            second_credit,
        ];
        let mut savings = SavingsRecord::opened_with("g1", Amount::rupiah(50_000), day(1));
        savings.debit(Amount::rupiah(20_000), day(2)).unwrap();
        savings.credit(Amount::rupiah(5_000), day(3)).unwrap();
        BankData {
            groups: vec![group("g1", "RT 01")],
            waste_prices: vec![WastePrice::new("plastik", "Plastik", Amount::rupiah(5_000))],
            waste_deposits: vec![first, second],
            transactions,
            savings: vec![savings],
            ..Default::default()
        }
    }

    #[test]
    fn test_consistent_data_passes() {
        let data = data();
        assert!(audit(&data).unwrap().is_empty());
        validate(&data).unwrap();
        let expected = expected_savings(&data).unwrap();
        assert_eq!(expected["g1"].balance, Amount::rupiah(35_000));
    }

    #[test]
    fn test_tampered_balance_found() {
        let mut data = data();
        data.savings[0].balance = Amount::rupiah(99_000);
        data.savings[0].total_deposits = Amount::rupiah(119_000);
        let mismatches = audit(&data).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].group_id, "g1");
        let err = validate(&data).unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Backup));
    }

    #[test]
    fn test_missing_savings_record_found() {
        let mut data = data();
        data.savings.clear();
        let mismatches = audit(&data).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].actual.is_none());
    }

    #[test]
    fn test_overflowing_history_is_an_error() {
        let mut data = data();
        data.transactions[0].amount = Amount::new(rust_decimal::Decimal::MAX);
        data.transactions[2].amount = Amount::new(rust_decimal::Decimal::MAX);
        assert!(audit(&data).is_err());
        let err = validate(&data).unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Backup));
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let mut data = data();
        data.transactions[1].group_id = "ghost".to_string();
        let err = validate(&data).unwrap_err();
        assert!(err.to_string().contains("unknown group"));
    }

    #[test]
    fn test_uncredited_deposit_rejected() {
        let mut data = data();
        let (extra, _) = weigh_in("d3", 4, 4);
        data.waste_deposits.push(extra);
        // savings and transactions still agree, only the weigh-in is orphaned
        assert!(audit(&data).unwrap().is_empty());
        let err = validate(&data).unwrap_err();
        assert_eq!(Error::type_of(&err), Some(ErrorType::Backup));
        assert!(err.to_string().contains("deposit d3 was never credited"));
    }

    #[test]
    fn test_deposit_credit_must_match() {
        let mut wrong_amount = data();
        wrong_amount.waste_deposits[1].value = Amount::rupiah(6_000);
        let err = validate(&wrong_amount).unwrap_err();
        assert!(err.to_string().contains("deposit d2 of group g1 is worth Rp6.000"));

        let mut twice = data();
        let mut again = twice.transactions[0].clone();
        again.id = "t-again".to_string();
        twice.transactions.push(again);
        let err = validate(&twice).unwrap_err();
        assert!(err.to_string().contains("credited more than once"));

        let mut unlinked = data();
        unlinked.transactions[2].deposit_id = None;
        let err = validate(&unlinked).unwrap_err();
        assert!(err.to_string().contains("has no deposit"));

        let mut mispriced = data();
        mispriced.waste_deposits[0].price_per_kg = Amount::rupiah(4_000);
        let err = validate(&mispriced).unwrap_err();
        assert!(err.to_string().contains("is not worth"));
    }

    #[test]
    fn test_duplicate_group_name_rejected() {
        let mut data = data();
        data.groups.push(group("g2", "rt 01"));
        assert!(validate(&data).is_err());
    }

    #[test]
    fn test_names_fold_ascii_case_only() {
        // SQLite NOCASE treats these as different names
        let mut data = data();
        data.groups.push(group("g2", "RT Ä"));
        data.groups.push(group("g3", "rt ä"));
        validate(&data).unwrap();

        data.groups.push(group("g4", "rt Ä"));
        let err = validate(&data).unwrap_err();
        assert!(err.to_string().contains("duplicate group name"));
    }
}
