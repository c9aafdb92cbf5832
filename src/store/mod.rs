//! Destination store for canonical trips.
//!
//! [`TripStore`] is the seam between the import pipeline and persistence:
//!
//! 1. **Bulk transfer** (`bulk_insert`) - one atomic round trip per batch
//! 2. **Single-row insert** (`insert_one`) - the fallback path, one transaction per row
//!
//! The PostgreSQL implementation lives in [`postgres`]; batches are laid out in
//! columnar form by [`columns`] for UNNEST-based inserts.

pub mod columns;
pub mod migration;
pub mod postgres;

pub use columns::TripColumns;
pub use migration::run_migrations;
pub use postgres::PgTripStore;

use crate::models::CanonicalRecord;
use thiserror::Error;

/// SQLSTATE codes meaning the statement does not match the table layout.
const SCHEMA_SQLSTATES: [&str; 3] = ["42P01", "42703", "42804"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("column {column} rejected value: {reason}")]
    Column {
        column: &'static str,
        reason: String,
    },
    #[error("destination layout mismatch: {0}")]
    Layout(String),
}

impl StoreError {
    /// Whether this fault comes from the column mapping or table layout
    /// rather than from the data in a particular row.
    pub fn is_schema_fault(&self) -> bool {
        match self {
            StoreError::Layout(_) => true,
            StoreError::Database(sqlx::Error::Database(db_err)) => db_err
                .code()
                .map(|code| SCHEMA_SQLSTATES.iter().any(|state| code == *state))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Persistence operations the batch loader needs.
///
/// A store is used by one run at a time and never concurrently.
#[allow(async_fn_in_trait)]
pub trait TripStore {
    /// Insert the whole batch atomically. On error nothing from the batch
    /// has been stored. Returns the number of rows written.
    async fn bulk_insert(&mut self, batch: &[CanonicalRecord]) -> Result<usize, StoreError>;

    /// Insert a single record in its own transaction. On error the record
    /// has not been stored and nothing about it remains pending.
    async fn insert_one(&mut self, record: &CanonicalRecord) -> Result<(), StoreError>;
}
