use thiserror::Error;

use crate::domain::SettlementError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("History entry not found: {0}")]
    HistoryEntryNotFound(String),

    #[error("History entry already exists: {0}")]
    HistoryEntryAlreadyExists(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
