use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{HistoryEntry, HistoryEntryId, HistoryRecord, RecordKind};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_TIMESTAMP_INDEX};

/// Repository persisting calculation records as JSON payloads.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_TIMESTAMP_INDEX)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Store a history entry. Entries are never updated afterwards.
    pub async fn save_entry(&self, entry: &HistoryEntry) -> Result<()> {
        let payload =
            serde_json::to_string(&entry.record).context("Failed to serialize record")?;

        sqlx::query(
            r#"
            INSERT INTO calculations (id, kind, timestamp, recorded_at, payload)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.record.kind().as_str())
        .bind(sortable_timestamp(entry.record.timestamp()))
        .bind(sortable_timestamp(entry.recorded_at))
        .bind(&payload)
        .execute(&self.pool)
        .await
        .context("Failed to save calculation")?;
        Ok(())
    }

    /// Get a history entry by ID.
    pub async fn get_entry(&self, id: HistoryEntryId) -> Result<Option<HistoryEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, recorded_at, payload
            FROM calculations
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch calculation")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_entry(&row)?)),
            None => Ok(None),
        }
    }

    /// List every entry, most recent calculation first.
    pub async fn list_entries(&self) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, recorded_at, payload
            FROM calculations
            ORDER BY timestamp DESC, recorded_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list calculations")?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    /// Delete an entry. Returns false when no entry had that ID.
    pub async fn delete_entry(&self, id: HistoryEntryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM calculations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete calculation")?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every entry and return how many were removed.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM calculations")
            .execute(&self.pool)
            .await
            .context("Failed to clear calculations")?;
        Ok(result.rows_affected())
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<HistoryEntry> {
        let id_str: String = row.get("id");
        let kind_str: String = row.get("kind");
        let recorded_at_str: String = row.get("recorded_at");
        let payload: String = row.get("payload");

        let kind = kind_str
            .parse::<RecordKind>()
            .map_err(|e| anyhow::anyhow!(e))?;
        let record: HistoryRecord = serde_json::from_str(&payload)
            .with_context(|| format!("Invalid payload for calculation {}", id_str))?;
        if record.kind() != kind {
            anyhow::bail!(
                "Calculation {} is stored as {} but its payload is {}",
                id_str,
                kind,
                record.kind()
            );
        }

        Ok(HistoryEntry {
            id: Uuid::parse_str(&id_str).context("Invalid calculation ID")?,
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
                .context("Invalid recorded_at timestamp")?
                .with_timezone(&Utc),
            record,
        })
    }
}

// Fixed-width UTC timestamps sort correctly as text.
fn sortable_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
