use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{decimal_cents, Cents};

/// Description used when an expense is recorded without one.
pub const DEFAULT_DESCRIPTION: &str = "Expense";

/// A single purchase paid by one participant and shared by a subset of the group.
///
/// The payer is not implicitly a sharer: a payer that should carry part of the
/// cost has to appear in `shared_by`.
///
/// Deserialized expenses go through [`Expense::new`] like any other input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredExpense")]
pub struct Expense {
    pub description: String,
    /// Total amount in cents
    #[serde(with = "decimal_cents")]
    pub amount: Cents,
    /// Name of the participant who paid
    pub payer: String,
    /// Names of the participants splitting the amount equally
    pub shared_by: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredExpense {
    #[serde(default)]
    description: String,
    #[serde(deserialize_with = "decimal_cents::deserialize")]
    amount: Cents,
    payer: String,
    shared_by: Vec<String>,
}

impl From<StoredExpense> for Expense {
    fn from(stored: StoredExpense) -> Self {
        Expense::new(
            stored.description,
            stored.amount,
            stored.payer,
            stored.shared_by,
        )
    }
}

impl Expense {
    /// Build an expense from raw input.
    ///
    /// Names are trimmed, blank sharer names dropped and repeated sharers
    /// collapsed, since `shared_by` is a set. A blank description becomes
    /// [`DEFAULT_DESCRIPTION`].
    pub fn new<I, S>(
        description: impl AsRef<str>,
        amount: Cents,
        payer: impl AsRef<str>,
        shared_by: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let description = description.as_ref().trim();
        let description = if description.is_empty() {
            DEFAULT_DESCRIPTION.to_string()
        } else {
            description.to_string()
        };

        let mut seen = HashSet::new();
        let shared_by = shared_by
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect();

        Self {
            description,
            amount,
            payer: payer.as_ref().trim().to_string(),
            shared_by,
        }
    }

    /// Positive amount, named payer and at least one sharer.
    pub fn is_well_formed(&self) -> bool {
        self.amount > 0 && !self.payer.is_empty() && !self.shared_by.is_empty()
    }

    /// True when the payer and every sharer are in `roster`.
    pub fn references_only(&self, roster: &HashSet<&str>) -> bool {
        roster.contains(self.payer.as_str())
            && self
                .shared_by
                .iter()
                .all(|name| roster.contains(name.as_str()))
    }
}

/// Normalize a participant list: trim names, drop blanks, and keep only the
/// first occurrence of each name.
///
/// Names are the identity of a participant, so two entries with the same
/// display name are the same person.
pub fn participant_roster<S: AsRef<str>>(participants: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut roster = Vec::with_capacity(participants.len());

    for name in participants {
        let name = name.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_string()) {
            roster.push(name.to_string());
        } else {
            tracing::warn!(participant = name, "duplicate participant name merged");
        }
    }

    roster
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_description_defaults() {
        let expense = Expense::new("   ", 1000, "Ann", ["Ann", "Bob"]);
        assert_eq!(expense.description, DEFAULT_DESCRIPTION);

        let named = Expense::new(" Pizza ", 1000, "Ann", ["Ann"]);
        assert_eq!(named.description, "Pizza");
    }

    #[test]
    fn test_shared_by_is_a_set() {
        let expense = Expense::new("Taxi", 3000, " Ann ", ["Bob", "Ann", "Bob", " ", "Cid"]);
        assert_eq!(expense.payer, "Ann");
        assert_eq!(expense.shared_by, vec!["Bob", "Ann", "Cid"]);
    }

    #[test]
    fn test_well_formed() {
        assert!(Expense::new("", 1, "Ann", ["Ann"]).is_well_formed());
        assert!(!Expense::new("", 0, "Ann", ["Ann"]).is_well_formed());
        assert!(!Expense::new("", -500, "Ann", ["Ann"]).is_well_formed());
        assert!(!Expense::new("", 500, "  ", ["Ann"]).is_well_formed());
        assert!(!Expense::new("", 500, "Ann", Vec::<String>::new()).is_well_formed());
    }

    #[test]
    fn test_references_only() {
        let roster: HashSet<&str> = ["Ann", "Bob"].into_iter().collect();
        assert!(Expense::new("", 500, "Ann", ["Bob"]).references_only(&roster));
        assert!(!Expense::new("", 500, "Zed", ["Bob"]).references_only(&roster));
        assert!(!Expense::new("", 500, "Ann", ["Bob", "Zed"]).references_only(&roster));
    }

    #[test]
    fn test_participant_roster_merges_duplicates() {
        let roster = participant_roster(&["Ann", " Bob", "", "Ann", "Cid "]);
        assert_eq!(roster, vec!["Ann", "Bob", "Cid"]);
    }

    #[test]
    fn test_deserialized_expense_is_normalized() {
        let expense: Expense = serde_json::from_str(
            r#"{"description":" ","amount":12.5,"payer":" Ann","sharedBy":["Bob","Ann","Bob",""]}"#,
        )
        .unwrap();
        assert_eq!(expense, Expense::new("", 1250, "Ann", ["Bob", "Ann"]));
        assert_eq!(expense.description, DEFAULT_DESCRIPTION);

        let undescribed: Expense =
            serde_json::from_str(r#"{"amount":1,"payer":"Ann","sharedBy":["Ann"]}"#).unwrap();
        assert_eq!(undescribed.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_expense_json_shape() {
        let expense = Expense::new("Dinner", 4550, "Ann", ["Ann", "Bob"]);
        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "description": "Dinner",
                "amount": 45.5,
                "payer": "Ann",
                "sharedBy": ["Ann", "Bob"],
            })
        );
    }
}
