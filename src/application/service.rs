use chrono::{DateTime, Utc};

use crate::domain::{
    CalculationInput, CalculationRecord, Expense, HistoryEntry, HistoryEntryId, HistoryRecord,
    Settlement,
};
use crate::storage::Repository;

use super::AppError;

/// Application service providing high-level operations over calculations
/// and their history. This is the primary interface for any client.
pub struct SettlementService {
    repo: Repository,
}

/// Result of a calculation that was written to history
pub struct SavedCalculation {
    pub entry: HistoryEntry,
    pub settlement: Settlement,
}

impl SettlementService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Calculations
    // ========================

    /// Compute nets and transfers without touching storage.
    pub fn calculate<S: AsRef<str>>(
        participants: &[S],
        expenses: &[Expense],
    ) -> Result<Settlement, AppError> {
        let input = CalculationInput::prepare(participants, expenses)?;
        Ok(input.settle())
    }

    /// Compute a settlement and record it in history.
    pub async fn calculate_and_save<S: AsRef<str>>(
        &self,
        participants: &[S],
        expenses: &[Expense],
        timestamp: DateTime<Utc>,
    ) -> Result<SavedCalculation, AppError> {
        let input = CalculationInput::prepare(participants, expenses)?;
        let settlement = input.settle();

        let record = CalculationRecord::new(&input, settlement.clone(), timestamp);
        let entry = self.save_record(HistoryRecord::Advanced(record)).await?;

        Ok(SavedCalculation { entry, settlement })
    }

    // ========================
    // History
    // ========================

    /// Store a record as a new history entry.
    pub async fn save_record(&self, record: HistoryRecord) -> Result<HistoryEntry, AppError> {
        let entry = HistoryEntry::new(record);
        self.repo.save_entry(&entry).await?;
        tracing::info!(id = %entry.id, kind = %entry.record.kind(), "saved calculation");
        Ok(entry)
    }

    /// Store an entry keeping its original ID, e.g. when restoring an export.
    pub async fn restore_entry(&self, entry: &HistoryEntry) -> Result<(), AppError> {
        if self.repo.get_entry(entry.id).await?.is_some() {
            return Err(AppError::HistoryEntryAlreadyExists(entry.id.to_string()));
        }
        self.repo.save_entry(entry).await?;
        Ok(())
    }

    /// List history, most recent calculation first.
    pub async fn list_history(&self) -> Result<Vec<HistoryEntry>, AppError> {
        Ok(self.repo.list_entries().await?)
    }

    /// Get a single history entry.
    pub async fn get_history(&self, id: HistoryEntryId) -> Result<HistoryEntry, AppError> {
        self.repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::HistoryEntryNotFound(id.to_string()))
    }

    /// Delete a history entry and return it.
    pub async fn delete_history(&self, id: HistoryEntryId) -> Result<HistoryEntry, AppError> {
        let entry = self.get_history(id).await?;
        self.repo.delete_entry(id).await?;
        tracing::info!(id = %id, "deleted calculation");
        Ok(entry)
    }

    /// Delete all history. Returns the number of removed entries.
    pub async fn clear_history(&self) -> Result<u64, AppError> {
        let removed = self.repo.clear().await?;
        tracing::info!(removed, "cleared calculation history");
        Ok(removed)
    }
}
