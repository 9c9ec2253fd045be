use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    cents_to_fine, decimal_cents, div_round_half_away, fine_to_cents, Cents, Expense, FineCents,
};

/// What a participant paid and what they owe across a set of expenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    pub name: String,
    /// Sum of the amounts this participant paid, in fine units
    pub paid: FineCents,
    /// Sum of this participant's shares, in fine units
    pub owed: FineCents,
}

impl BalanceEntry {
    fn new(name: String) -> Self {
        Self {
            name,
            paid: 0,
            owed: 0,
        }
    }
}

/// Signed position of a participant: positive means they are owed money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetBalance {
    pub name: String,
    #[serde(with = "decimal_cents")]
    pub net: Cents,
}

/// Fold expenses into one (paid, owed) entry per participant.
///
/// Every participant gets an entry, in roster order, even without expenses.
/// Each expense is split equally among its sharers. Expenses are expected to
/// be well formed and to reference only roster names; other names are ignored.
pub fn aggregate_balances(participants: &[String], expenses: &[Expense]) -> Vec<BalanceEntry> {
    let mut entries: Vec<BalanceEntry> = Vec::with_capacity(participants.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(participants.len());

    for name in participants {
        if !index.contains_key(name.as_str()) {
            index.insert(name.as_str(), entries.len());
            entries.push(BalanceEntry::new(name.clone()));
        }
    }

    for expense in expenses {
        let amount = cents_to_fine(expense.amount);
        let share = div_round_half_away(amount, expense.shared_by.len() as FineCents);

        if let Some(&i) = index.get(expense.payer.as_str()) {
            entries[i].paid += amount;
        }
        for sharer in &expense.shared_by {
            if let Some(&i) = index.get(sharer.as_str()) {
                entries[i].owed += share;
            }
        }
    }

    entries
}

/// Reduce (paid, owed) pairs to nets rounded half away from zero to cents.
/// Output order follows the input order.
///
/// Each net is rounded on its own, so the nets of a split with sub-cent
/// shares may not cancel exactly: their sum can be off by up to half a cent
/// per participant, and that bound grows with the size of the group.
pub fn net_balances(entries: &[BalanceEntry]) -> Vec<NetBalance> {
    entries
        .iter()
        .map(|entry| NetBalance {
            name: entry.name.clone(),
            net: fine_to_cents(entry.paid - entry.owed),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_aggregate_initializes_every_participant() {
        let entries = aggregate_balances(&roster(&["Ann", "Bob", "Cid"]), &[]);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.paid == 0 && e.owed == 0));
        assert_eq!(entries[2].name, "Cid");
    }

    #[test]
    fn test_payer_outside_shared_by_owes_nothing() {
        let expenses = vec![Expense::new("Gift", 9000, "Ann", ["Bob", "Cid"])];
        let entries = aggregate_balances(&roster(&["Ann", "Bob", "Cid"]), &expenses);

        assert_eq!(entries[0].paid, cents_to_fine(9000));
        assert_eq!(entries[0].owed, 0);
        assert_eq!(entries[1].owed, cents_to_fine(4500));
        assert_eq!(entries[2].owed, cents_to_fine(4500));
    }

    #[test]
    fn test_uneven_split_keeps_sub_cent_precision() {
        let expenses = vec![
            Expense::new("Hotel", 10000, "Ann", ["Ann", "Bob", "Cid"]),
            Expense::new("Fuel", 6000, "Bob", ["Ann", "Bob", "Cid"]),
        ];
        let entries = aggregate_balances(&roster(&["Ann", "Bob", "Cid"]), &expenses);
        let nets = net_balances(&entries);

        assert_eq!(entries[2].owed, 33_333_333 + 20_000_000);
        assert_eq!(
            nets.iter().map(|n| n.net).collect::<Vec<_>>(),
            vec![4667, 667, -5333]
        );
    }

    #[test]
    fn test_rounding_drift_grows_with_group_size() {
        let expenses = vec![
            Expense::new("", 1, "A", ["B", "C"]),
            Expense::new("", 1, "D", ["E", "F"]),
        ];
        let nets = net_balances(&aggregate_balances(
            &roster(&["A", "B", "C", "D", "E", "F"]),
            &expenses,
        ));

        let values: Vec<Cents> = nets.iter().map(|n| n.net).collect();
        assert_eq!(values, vec![1, -1, -1, 1, -1, -1]);
        assert_eq!(values.iter().sum::<Cents>(), -2);
    }

    #[test]
    fn test_net_balances_keep_roster_order() {
        let expenses = vec![Expense::new("Lunch", 3000, "Cid", ["Ann", "Bob", "Cid"])];
        let nets = net_balances(&aggregate_balances(&roster(&["Bob", "Cid", "Ann"]), &expenses));

        let names: Vec<_> = nets.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Cid", "Ann"]);
        assert_eq!(nets[1].net, 2000);
    }
}
