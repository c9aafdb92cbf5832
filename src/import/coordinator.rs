//! Import run coordination.
//!
//! An [`ImportRun`] sequences one end-to-end import:
//! 1. Read and validate the input file
//! 2. Normalize each row, recording rejections
//! 3. Classify rows as fresh or duplicate
//! 4. Load fresh rows in fixed-size batches
//! 5. Write duplicates to the side file
//!
//! Rows are processed strictly in file order, so "first occurrence wins" and
//! batch boundaries are both defined by the input order.

use crate::config::{ImporterConfig, same_file};
use crate::error::ImportError;
use crate::import::dedup::{Classification, Deduplicator};
use crate::import::duplicates::{DuplicateSink, SinkOutcome};
use crate::import::loader::BatchLoader;
use crate::import::normalizer::RowNormalizer;
use crate::import::reader::RecordReader;
use crate::import::stats::ImportSummary;
use crate::import::timezone::TimeConverter;
use crate::models::CanonicalRecord;
use crate::store::TripStore;
use std::path::Path;

/// State for one import of one file.
///
/// Counters and the duplicate key set belong to the run; nothing is shared
/// between runs.
pub struct ImportRun<S, C> {
    config: ImporterConfig,
    reader: RecordReader,
    normalizer: RowNormalizer<C>,
    loader: BatchLoader<S>,
    summary: ImportSummary,
}

impl<S: TripStore, C: TimeConverter> ImportRun<S, C> {
    /// Build a run. Fails if the configured batch size is not positive.
    pub fn new(config: ImporterConfig, store: S, converter: C) -> Result<Self, ImportError> {
        let batch_size = config.batch_size()?;
        Ok(Self {
            reader: RecordReader::new(config.reader.clone()),
            normalizer: RowNormalizer::new(converter),
            loader: BatchLoader::new(store, batch_size)?,
            summary: ImportSummary::default(),
            config,
        })
    }

    /// Rows inserted so far, also meaningful after a fatal fault.
    pub fn inserted(&self) -> usize {
        self.summary.inserted
    }

    pub fn store(&self) -> &S {
        self.loader.store()
    }

    pub fn into_store(self) -> S {
        self.loader.into_store()
    }

    /// Import the file at `path` and return the final summary.
    pub async fn import(&mut self, path: &Path) -> Result<ImportSummary, ImportError> {
        self.summary = ImportSummary::default();

        if path.to_string_lossy().trim().is_empty() {
            return Err(ImportError::config("csv file path must be provided"));
        }

        let records = self.reader.read(path)?;
        if records.is_empty() {
            log::info!("{} contains no data rows, nothing to import", path.display());
            return Ok(self.summary.clone());
        }
        self.summary.total_rows = records.len();

        let batch_size = self.loader.batch_size();
        let mut dedup = Deduplicator::new();
        let mut duplicates: Vec<CanonicalRecord> = Vec::new();
        let mut batch: Vec<CanonicalRecord> = Vec::with_capacity(batch_size);

        for raw in &records {
            let record = match self.normalizer.normalize(raw) {
                Ok(record) => record,
                Err(rejection) => {
                    log::debug!("{}", rejection);
                    self.summary.record_rejection(rejection.to_string());
                    continue;
                }
            };

            match dedup.classify(&record) {
                Classification::Duplicate => {
                    self.summary.duplicates += 1;
                    duplicates.push(record);
                }
                Classification::Fresh => {
                    batch.push(record);
                    if batch.len() == batch_size {
                        self.flush(&mut batch).await?;
                    }
                }
            }
        }
        self.flush(&mut batch).await?;

        let sink = DuplicateSink::new(
            self.config.duplicates_path_for(path),
            self.config.reader.delimiter,
        );
        if !duplicates.is_empty() && same_file(sink.path(), path) {
            self.summary.warn(format!(
                "duplicates file {} is the input file, {} duplicates not written",
                sink.path().display(),
                duplicates.len()
            ));
        } else {
            self.record_sink(sink.write(&duplicates));
        }

        log::info!(
            "import finished: {} rows, {} inserted, {} duplicates, {} rejected",
            self.summary.total_rows,
            self.summary.inserted,
            self.summary.duplicates,
            self.summary.rejected
        );
        Ok(self.summary.clone())
    }

    fn record_sink(&mut self, outcome: SinkOutcome) {
        match outcome {
            SinkOutcome::NoDuplicates => {}
            SinkOutcome::Written { path, .. } => self.summary.duplicates_file = Some(path),
            SinkOutcome::Failed { path, error } => self.summary.warn(format!(
                "failed to write duplicates file {}: {}",
                path.display(),
                error
            )),
        }
    }

    async fn flush(&mut self, batch: &mut Vec<CanonicalRecord>) -> Result<(), ImportError> {
        if batch.is_empty() {
            return Ok(());
        }

        let outcome = self
            .loader
            .load_batch(batch)
            .await
            .map_err(ImportError::Schema)?;
        self.summary.merge(outcome);
        batch.clear();
        Ok(())
    }
}
