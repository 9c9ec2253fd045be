use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    decimal_cents, div_round_half_away, CalculationInput, Cents, Expense, NetBalance, Settlement,
    Transfer,
};

/// Kind tag of a stored calculation, as written in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Uneven split with per-expense payers and sharers
    Advanced,
    /// Legacy equal split of food and alcohol totals
    Simple,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Advanced => "advanced",
            RecordKind::Simple => "simple",
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "advanced" => Ok(RecordKind::Advanced),
            "simple" => Ok(RecordKind::Simple),
            other => Err(format!("unknown record type: {}", other)),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of one calculation. Never modified after it is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRecord {
    pub timestamp: DateTime<Utc>,
    pub participants: Vec<String>,
    pub expenses: Vec<Expense>,
    pub totals: Vec<NetBalance>,
    pub settlement: Vec<Transfer>,
    #[serde(with = "decimal_cents")]
    pub total_spent: Cents,
}

impl CalculationRecord {
    pub fn new(input: &CalculationInput, settlement: Settlement, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            participants: input.participants.clone(),
            expenses: input.expenses.clone(),
            totals: settlement.totals,
            settlement: settlement.transfers,
            total_spent: settlement.total_spent,
        }
    }
}

/// Legacy record: food and alcohol totals split equally among `names`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRecord {
    pub timestamp: DateTime<Utc>,
    pub names: Vec<String>,
    #[serde(with = "decimal_cents")]
    pub alcohol: Cents,
    #[serde(with = "decimal_cents")]
    pub food: Cents,
}

impl SimpleRecord {
    pub fn total(&self) -> Cents {
        self.alcohol.saturating_add(self.food)
    }

    /// Equal share per person, or `None` for a record without names.
    pub fn share_per_person(&self) -> Option<Cents> {
        if self.names.is_empty() {
            return None;
        }
        let share = div_round_half_away(self.total().into(), self.names.len() as i128);
        // never larger in magnitude than the total
        Some(share as Cents)
    }
}

/// Any record found in the calculation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HistoryRecord {
    Advanced(CalculationRecord),
    Simple(SimpleRecord),
}

impl HistoryRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            HistoryRecord::Advanced(_) => RecordKind::Advanced,
            HistoryRecord::Simple(_) => RecordKind::Simple,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            HistoryRecord::Advanced(record) => record.timestamp,
            HistoryRecord::Simple(record) => record.timestamp,
        }
    }

    /// Names involved in the calculation, in recorded order.
    pub fn people(&self) -> &[String] {
        match self {
            HistoryRecord::Advanced(record) => &record.participants,
            HistoryRecord::Simple(record) => &record.names,
        }
    }

    pub fn total_spent(&self) -> Cents {
        match self {
            HistoryRecord::Advanced(record) => record.total_spent,
            HistoryRecord::Simple(record) => record.total(),
        }
    }
}

pub type HistoryEntryId = Uuid;

/// A record as kept in the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    /// When the record was written to the store
    pub recorded_at: DateTime<Utc>,
    pub record: HistoryRecord,
}

impl HistoryEntry {
    pub fn new(record: HistoryRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            // Stored with microsecond precision
            recorded_at: Utc::now().trunc_subsecs(6),
            record,
        }
    }
}
