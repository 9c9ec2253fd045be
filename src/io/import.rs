use anyhow::Result;
use serde::Deserialize;
use std::io::Read;

use crate::application::{AppError, SettlementService};
use crate::domain::{parse_cents, Expense};
use crate::io::export::HistorySnapshot;

/// Error that occurred while reading a line of input
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Expenses read from CSV, plus the lines that could not be read
#[derive(Debug, Clone, Default)]
pub struct ExpenseImport {
    pub expenses: Vec<Expense>,
    pub errors: Vec<ImportError>,
}

/// Result of a history import
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Options for history imports
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_duplicates: bool,
}

#[derive(Debug, Deserialize)]
struct ExpenseRow {
    #[serde(default)]
    description: String,
    amount: String,
    payer: String,
    #[serde(default)]
    shared_by: String,
}

/// Read expenses from CSV with the header `description,amount,payer,shared_by`.
///
/// `shared_by` is a `;`-separated list of names. Lines that cannot be parsed
/// are reported in `errors`; semantic checks (positive amount, known names)
/// are left to the settlement engine.
pub fn read_expenses_csv<R: Read>(reader: R) -> Result<ExpenseImport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut import = ExpenseImport::default();

    for (line_num, result) in csv_reader.deserialize::<ExpenseRow>().enumerate() {
        let line = line_num + 2; // +2 for header and 0-indexing

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                import.errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("CSV parse error: {}", e),
                });
                continue;
            }
        };

        let amount = match parse_cents(&row.amount) {
            Ok(amount) => amount,
            Err(e) => {
                import.errors.push(ImportError {
                    line,
                    field: Some("amount".to_string()),
                    error: format!("Invalid amount '{}': {}", row.amount, e),
                });
                continue;
            }
        };

        import.expenses.push(Expense::new(
            &row.description,
            amount,
            &row.payer,
            row.shared_by.split(';'),
        ));
    }

    tracing::debug!(
        expenses = import.expenses.len(),
        errors = import.errors.len(),
        "read expenses from CSV"
    );
    Ok(import)
}

/// Importer for restoring history snapshots
pub struct Importer<'a> {
    service: &'a SettlementService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a SettlementService) -> Self {
        Self { service }
    }

    /// Import a JSON snapshot produced by `Exporter::export_history_json`.
    /// Entries keep their IDs, so importing the same snapshot twice collides.
    pub async fn import_history_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let snapshot: HistorySnapshot = serde_json::from_reader(reader)?;

        let mut imported = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();

        for (index, entry) in snapshot.entries.iter().enumerate() {
            if options.dry_run {
                imported += 1;
                continue;
            }

            match self.service.restore_entry(entry).await {
                Ok(()) => imported += 1,
                Err(AppError::HistoryEntryAlreadyExists(_)) if options.skip_duplicates => {
                    skipped += 1;
                }
                Err(e) => errors.push(ImportError {
                    line: index + 1,
                    field: None,
                    error: format!("Entry {} not restored: {}", entry.id, e),
                }),
            }
        }

        Ok(ImportResult {
            imported,
            skipped,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_expenses_csv() {
        let data = "\
description,amount,payer,shared_by
Hotel,100.00,Ann,Ann;Bob;Cid
,12.5,Bob, Ann ; Bob
";
        let import = read_expenses_csv(data.as_bytes()).unwrap();

        assert!(import.errors.is_empty());
        assert_eq!(import.expenses.len(), 2);
        assert_eq!(import.expenses[0].amount, 10000);
        assert_eq!(import.expenses[0].shared_by, vec!["Ann", "Bob", "Cid"]);
        assert_eq!(import.expenses[1].description, "Expense");
        assert_eq!(import.expenses[1].amount, 1250);
        assert_eq!(import.expenses[1].shared_by, vec!["Ann", "Bob"]);
    }

    #[test]
    fn test_read_expenses_csv_reports_bad_lines() {
        let data = "\
description,amount,payer,shared_by
Taxi,abc,Ann,Bob
Snacks,4.20,Bob,Ann
Tickets,1.234,Ann,Bob
";
        let import = read_expenses_csv(data.as_bytes()).unwrap();

        assert_eq!(import.expenses.len(), 1);
        assert_eq!(import.expenses[0].description, "Snacks");
        assert_eq!(import.errors.len(), 2);
        assert_eq!(import.errors[0].line, 2);
        assert_eq!(import.errors[0].field.as_deref(), Some("amount"));
        assert_eq!(import.errors[1].line, 4);
    }

    #[test]
    fn test_non_positive_amounts_are_left_to_the_engine() {
        let data = "description,amount,payer,shared_by\nRefund,-5,Ann,Bob\n";
        let import = read_expenses_csv(data.as_bytes()).unwrap();

        assert!(import.errors.is_empty());
        assert!(!import.expenses[0].is_well_formed());
    }
}
