//! Batch loading with row-by-row fallback.
//!
//! Each batch is first offered to the store as one bulk transfer. When that
//! fails the batch is replayed one row at a time, each row in its own
//! transaction, so good rows are salvaged and every bad row gets its own
//! error message.

use crate::error::ImportError;
use crate::models::CanonicalRecord;
use crate::store::{StoreError, TripStore};
use chrono::SecondsFormat;

/// Result of loading one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Rows that reached the store
    pub inserted: usize,
    /// One message per row whose individual insert failed
    pub failures: Vec<String>,
    /// Whether the bulk transfer failed and the per-row path was used
    pub fell_back: bool,
}

/// Drives bulk insertion of fixed-size batches into a [`TripStore`].
pub struct BatchLoader<S> {
    store: S,
    batch_size: usize,
    batches_loaded: usize,
}

impl<S: TripStore> BatchLoader<S> {
    pub fn new(store: S, batch_size: usize) -> Result<Self, ImportError> {
        if batch_size == 0 {
            return Err(ImportError::config("batch size must be positive"));
        }
        Ok(Self {
            store,
            batch_size,
            batches_loaded: 0,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Load one batch.
    ///
    /// Returns `Err` only when the bulk transfer fails because the column
    /// mapping does not match the destination; every row would fail the same
    /// way, so there is no fallback for that case.
    pub async fn load_batch(
        &mut self,
        batch: &[CanonicalRecord],
    ) -> Result<BatchOutcome, StoreError> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }
        self.batches_loaded += 1;
        let batch_number = self.batches_loaded;

        let bulk_error = match self.store.bulk_insert(batch).await {
            Ok(inserted) => {
                log::debug!("batch {}: bulk inserted {} trips", batch_number, inserted);
                return Ok(BatchOutcome {
                    inserted,
                    failures: Vec::new(),
                    fell_back: false,
                });
            }
            Err(err) if err.is_schema_fault() => {
                log::error!("batch {}: bulk insert hit a schema fault: {}", batch_number, err);
                return Err(err);
            }
            Err(err) => err,
        };

        log::warn!(
            "batch {}: bulk insert of {} trips failed, falling back to row-by-row: {}",
            batch_number,
            batch.len(),
            bulk_error
        );

        let outcome = self.insert_rows(batch).await;

        if outcome.inserted == 0 {
            log::error!(
                "batch {}: all {} row inserts failed after bulk failure ({}); check the column mapping",
                batch_number,
                batch.len(),
                bulk_error
            );
        } else {
            log::info!(
                "batch {}: fallback inserted {} of {} trips",
                batch_number,
                outcome.inserted,
                batch.len()
            );
        }
        Ok(outcome)
    }

    async fn insert_rows(&mut self, batch: &[CanonicalRecord]) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            fell_back: true,
            ..BatchOutcome::default()
        };

        for record in batch {
            match self.store.insert_one(record).await {
                Ok(()) => outcome.inserted += 1,
                Err(err) => {
                    let message = format!(
                        "line {}: failed to insert row (pickup={}): {}",
                        record.line,
                        record
                            .pickup_datetime
                            .to_rfc3339_opts(SecondsFormat::Millis, true),
                        err
                    );
                    log::warn!("{}", message);
                    outcome.failures.push(message);
                }
            }
        }
        outcome
    }
}
