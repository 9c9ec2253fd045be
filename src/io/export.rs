use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::SettlementService;
use crate::domain::{format_cents, HistoryEntry, Settlement};

/// History snapshot for full export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub entries: Vec<HistoryEntry>,
}

/// Exporter for writing calculation history
pub struct Exporter<'a> {
    service: &'a SettlementService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a SettlementService) -> Self {
        Self { service }
    }

    /// Export the whole history as a JSON snapshot
    pub async fn export_history_json<W: Write>(&self, mut writer: W) -> Result<HistorySnapshot> {
        let entries = self.service.list_history().await?;

        let snapshot = HistorySnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            entries,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

/// Write the transfers of a settlement as CSV (`from,to,amount`).
pub fn write_settlement_csv<W: Write>(settlement: &Settlement, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["from", "to", "amount"])?;

    for transfer in &settlement.transfers {
        csv_writer.write_record([
            transfer.from.as_str(),
            transfer.to.as_str(),
            format_cents(transfer.amount).as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(settlement.transfers.len())
}

/// Write the net balances of a settlement as CSV (`name,net`).
pub fn write_totals_csv<W: Write>(settlement: &Settlement, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["name", "net"])?;

    for balance in &settlement.totals {
        csv_writer.write_record([balance.name.as_str(), format_cents(balance.net).as_str()])?;
    }

    csv_writer.flush()?;
    Ok(settlement.totals.len())
}
