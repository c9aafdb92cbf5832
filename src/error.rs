use crate::import::reader::ReadError;
use crate::store::StoreError;
use thiserror::Error;

/// Fatal faults that abort an import run.
///
/// Row-level rejections are not represented here; they are recorded in the
/// [`crate::import::ImportSummary`] and the run continues.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("input file rejected: {0}")]
    Input(#[from] ReadError),
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("destination schema mismatch, aborting run: {0}")]
    Schema(StoreError),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl ImportError {
    pub fn config(message: impl Into<String>) -> Self {
        ImportError::Config(message.into())
    }
}
