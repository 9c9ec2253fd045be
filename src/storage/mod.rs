mod repository;

pub use repository::*;

/// SQL migration for the calculation history table
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration indexing history by calculation time
pub const MIGRATION_002_TIMESTAMP_INDEX: &str =
    include_str!("migrations/002_calculations_timestamp_index.sql");
