use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    aggregate_balances, decimal_cents, net_balances, participant_roster, Cents, Expense,
    NetBalance, SETTLED_EPSILON,
};

/// A payment from a debtor to a creditor. Amount is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    #[serde(with = "decimal_cents")]
    pub amount: Cents,
}

/// Result of a calculation: nets in roster order and the transfers that clear them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub totals: Vec<NetBalance>,
    #[serde(rename = "settlement")]
    pub transfers: Vec<Transfer>,
    #[serde(with = "decimal_cents")]
    pub total_spent: Cents,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementError {
    #[error("No participants")]
    NoParticipants,

    #[error("No valid expenses")]
    NoValidExpenses,

    #[error("Total spent is too large")]
    AmountOutOfRange,
}

/// Participants and expenses that passed validation, ready to be settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationInput {
    pub participants: Vec<String>,
    pub expenses: Vec<Expense>,
}

impl CalculationInput {
    /// Normalize the roster and drop malformed expenses.
    ///
    /// An expense is dropped when its amount is not positive, its payer is
    /// blank, it has no sharers, or it names someone outside the roster.
    pub fn prepare<S: AsRef<str>>(
        participants: &[S],
        expenses: &[Expense],
    ) -> Result<Self, SettlementError> {
        let participants = participant_roster(participants);
        if participants.is_empty() {
            return Err(SettlementError::NoParticipants);
        }

        let roster: HashSet<&str> = participants.iter().map(String::as_str).collect();
        let expenses: Vec<Expense> = expenses
            .iter()
            .filter(|expense| {
                let keep = expense.is_well_formed() && expense.references_only(&roster);
                if !keep {
                    tracing::warn!(
                        description = %expense.description,
                        amount = expense.amount,
                        payer = %expense.payer,
                        "dropping malformed expense"
                    );
                }
                keep
            })
            .cloned()
            .collect();

        if expenses.is_empty() {
            return Err(SettlementError::NoValidExpenses);
        }
        // nets are bounded by the total, so a total that fits keeps every net in range
        if checked_total(&expenses).is_none() {
            return Err(SettlementError::AmountOutOfRange);
        }

        Ok(Self {
            participants,
            expenses,
        })
    }

    pub fn total_spent(&self) -> Cents {
        checked_total(&self.expenses).unwrap_or(Cents::MAX)
    }

    /// Run the aggregate -> net -> reduce pipeline.
    pub fn settle(&self) -> Settlement {
        let entries = aggregate_balances(&self.participants, &self.expenses);
        let totals = net_balances(&entries);
        let transfers = reduce_debts(&totals);

        tracing::debug!(
            participants = self.participants.len(),
            expenses = self.expenses.len(),
            transfers = transfers.len(),
            "settlement computed"
        );

        Settlement {
            totals,
            transfers,
            total_spent: self.total_spent(),
        }
    }
}

/// Compute net balances and a settling list of transfers.
pub fn compute_settlement<S: AsRef<str>>(
    participants: &[S],
    expenses: &[Expense],
) -> Result<Settlement, SettlementError> {
    Ok(CalculationInput::prepare(participants, expenses)?.settle())
}

fn checked_total(expenses: &[Expense]) -> Option<Cents> {
    expenses
        .iter()
        .try_fold(0 as Cents, |total, e| total.checked_add(e.amount))
}

struct Position<'a> {
    name: &'a str,
    remaining: Cents,
}

/// Greedily match debtors against creditors, both in input order.
///
/// This is a two-pointer heuristic, not a minimum-transfer solver: the first
/// open debtor always pays the first open creditor. Anyone within one cent of
/// zero is treated as settled.
pub fn reduce_debts(totals: &[NetBalance]) -> Vec<Transfer> {
    let mut debtors: Vec<Position> = Vec::new();
    let mut creditors: Vec<Position> = Vec::new();

    for balance in totals {
        if balance.net < -SETTLED_EPSILON {
            debtors.push(Position {
                name: &balance.name,
                remaining: -balance.net,
            });
        } else if balance.net > SETTLED_EPSILON {
            creditors.push(Position {
                name: &balance.name,
                remaining: balance.net,
            });
        }
    }

    let mut transfers = Vec::with_capacity(debtors.len() + creditors.len());
    let (mut d, mut c) = (0, 0);

    while d < debtors.len() && c < creditors.len() {
        let settled = debtors[d].remaining.min(creditors[c].remaining);
        transfers.push(Transfer {
            from: debtors[d].name.to_string(),
            to: creditors[c].name.to_string(),
            amount: settled,
        });

        debtors[d].remaining -= settled;
        creditors[c].remaining -= settled;

        if debtors[d].remaining < SETTLED_EPSILON {
            d += 1;
        }
        if creditors[c].remaining < SETTLED_EPSILON {
            c += 1;
        }
    }

    transfers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(name: &str, net: Cents) -> NetBalance {
        NetBalance {
            name: name.to_string(),
            net,
        }
    }

    fn transfer(from: &str, to: &str, amount: Cents) -> Transfer {
        Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        }
    }

    #[test]
    fn test_reduce_single_pair() {
        let transfers = reduce_debts(&[net("A", 5000), net("B", -5000)]);
        assert_eq!(transfers, vec![transfer("B", "A", 5000)]);
    }

    #[test]
    fn test_reduce_follows_list_order() {
        let transfers = reduce_debts(&[net("A", 4667), net("B", 667), net("C", -5333)]);
        assert_eq!(
            transfers,
            vec![transfer("C", "A", 4667), transfer("C", "B", 666)]
        );
    }

    #[test]
    fn test_reduce_advances_both_cursors_on_exact_match() {
        let transfers = reduce_debts(&[
            net("A", 3000),
            net("B", -3000),
            net("C", 2000),
            net("D", -2000),
        ]);
        assert_eq!(
            transfers,
            vec![transfer("B", "A", 3000), transfer("D", "C", 2000)]
        );
    }

    #[test]
    fn test_reduce_ignores_balances_within_one_cent() {
        assert!(reduce_debts(&[net("A", 1), net("B", -1), net("C", 0)]).is_empty());
        assert!(reduce_debts(&[net("A", 2000), net("B", 0)]).is_empty());
        assert!(reduce_debts(&[]).is_empty());
    }

    #[test]
    fn test_reduce_one_creditor_many_debtors() {
        let transfers = reduce_debts(&[
            net("D1", -1000),
            net("Big", 6000),
            net("D2", -2000),
            net("D3", -3000),
        ]);
        assert_eq!(
            transfers,
            vec![
                transfer("D1", "Big", 1000),
                transfer("D2", "Big", 2000),
                transfer("D3", "Big", 3000),
            ]
        );
    }

    #[test]
    fn test_prepare_rejects_empty_roster() {
        let expenses = vec![Expense::new("", 1000, "A", ["A"])];
        let empty: [&str; 0] = [];
        assert_eq!(
            CalculationInput::prepare(&empty, &expenses),
            Err(SettlementError::NoParticipants)
        );
        assert_eq!(
            CalculationInput::prepare(&["  "], &expenses),
            Err(SettlementError::NoParticipants)
        );
    }

    #[test]
    fn test_prepare_filters_malformed_expenses() {
        let expenses = vec![
            Expense::new("zero", 0, "A", ["A", "B"]),
            Expense::new("negative", -100, "A", ["A", "B"]),
            Expense::new("no payer", 100, "", ["A", "B"]),
            Expense::new("no sharers", 100, "A", Vec::<&str>::new()),
            Expense::new("stranger", 100, "Z", ["A"]),
            Expense::new("ok", 100, "A", ["B"]),
        ];
        let input = CalculationInput::prepare(&["A", "B"], &expenses).unwrap();
        assert_eq!(input.expenses.len(), 1);
        assert_eq!(input.expenses[0].description, "ok");
        assert_eq!(input.total_spent(), 100);
    }

    #[test]
    fn test_prepare_reports_no_valid_expenses() {
        let expenses = vec![Expense::new("", 0, "A", ["A"])];
        assert_eq!(
            compute_settlement(&["A"], &expenses),
            Err(SettlementError::NoValidExpenses)
        );
        assert_eq!(
            compute_settlement(&["A"], &[]),
            Err(SettlementError::NoValidExpenses)
        );
    }

    #[test]
    fn test_large_amounts_settle_without_overflow() {
        let amount = crate::domain::parse_cents("1000000000000000").unwrap();
        let expenses = vec![Expense::new("Island", amount, "A", ["A", "B"])];
        let settlement = compute_settlement(&["A", "B"], &expenses).unwrap();

        assert_eq!(settlement.totals[0].net, amount / 2);
        assert_eq!(settlement.totals[1].net, -amount / 2);
        assert_eq!(settlement.transfers, vec![transfer("B", "A", amount / 2)]);
        assert_eq!(settlement.total_spent, amount);
    }

    #[test]
    fn test_largest_amount_splits_unevenly() {
        let expenses = vec![Expense::new("", Cents::MAX, "A", ["A", "B", "C"])];
        let settlement = compute_settlement(&["A", "B", "C"], &expenses).unwrap();

        let third = Cents::MAX / 3;
        let nets: Vec<Cents> = settlement.totals.iter().map(|b| b.net).collect();
        assert_eq!(nets, vec![Cents::MAX - third, -third, -third]);
        assert_eq!(settlement.total_spent, Cents::MAX);
    }

    #[test]
    fn test_total_beyond_range_is_rejected() {
        let expenses = vec![
            Expense::new("", Cents::MAX, "A", ["B"]),
            Expense::new("", 1, "B", ["A"]),
        ];
        assert_eq!(
            compute_settlement(&["A", "B"], &expenses),
            Err(SettlementError::AmountOutOfRange)
        );
    }

    #[test]
    fn test_settlement_json_shape() {
        let expenses = vec![Expense::new("Dinner", 10000, "A", ["A", "B"])];
        let settlement = compute_settlement(&["A", "B"], &expenses).unwrap();
        let json = serde_json::to_value(&settlement).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totals": [{"name": "A", "net": 50.0}, {"name": "B", "net": -50.0}],
                "settlement": [{"from": "B", "to": "A", "amount": 50.0}],
                "totalSpent": 100.0,
            })
        );
    }
}
