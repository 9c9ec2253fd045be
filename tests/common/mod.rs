// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use divvy::application::SettlementService;
use divvy::domain::{Cents, Expense, Transfer};
use std::collections::HashMap;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(SettlementService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = SettlementService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Shorthand for an expense with a generated description
pub fn expense(amount: Cents, payer: &str, shared_by: &[&str]) -> Expense {
    Expense::new("", amount, payer, shared_by.iter().copied())
}

/// Apply transfers to nets: the payer's debt shrinks, the receiver's credit shrinks.
pub fn apply_transfers(
    totals: &[(String, Cents)],
    transfers: &[Transfer],
) -> HashMap<String, Cents> {
    let mut nets: HashMap<String, Cents> = totals.iter().cloned().collect();
    for transfer in transfers {
        *nets.get_mut(&transfer.from).unwrap() += transfer.amount;
        *nets.get_mut(&transfer.to).unwrap() -= transfer.amount;
    }
    nets
}

/// Trip fixture: three friends, uneven sharing
pub struct TripFixture;

impl TripFixture {
    pub fn participants() -> Vec<String> {
        vec!["Ann".into(), "Bob".into(), "Cid".into()]
    }

    pub fn expenses() -> Vec<Expense> {
        vec![
            Expense::new("Hotel", 10000, "Ann", ["Ann", "Bob", "Cid"]),
            Expense::new("Fuel", 6000, "Bob", ["Ann", "Bob", "Cid"]),
        ]
    }
}
