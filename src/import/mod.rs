//! Trip CSV import pipeline.
//!
//! This module loads a delimited file of trip records into the `trips` table:
//!
//! 1. **Reading** (`reader`) - Parses and validates the whole input file
//! 2. **Normalization** (`normalizer`, `timezone`) - Validates rows, converts local time to UTC
//! 3. **Deduplication** (`dedup`) - Drops repeats of (pickup, dropoff, passengers) within the run
//! 4. **Loading** (`loader`) - Bulk inserts batches, falling back to row-by-row on failure
//! 5. **Duplicates file** (`duplicates`) - Writes dropped duplicates for operator review
//! 6. **Coordination** (`coordinator`) - Sequences one run and builds the summary (`stats`)
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use trip_importer::import::{ImportRun, ZoneConverter};
//! use trip_importer::store::PgTripStore;
//!
//! let store = PgTripStore::acquire(&pool).await?;
//! let converter = ZoneConverter::from_name(&config.source_timezone)?;
//! let mut run = ImportRun::new(config, store, converter)?;
//!
//! let summary = run.import(Path::new("trips.csv")).await?;
//! println!("Inserted {} trips.", summary.inserted);
//! ```

pub mod coordinator;
pub mod dedup;
pub mod duplicates;
pub mod loader;
pub mod normalizer;
pub mod reader;
pub mod stats;
pub mod timezone;

pub use coordinator::ImportRun;
pub use dedup::{Classification, DedupKey, Deduplicator};
pub use duplicates::{DuplicateSink, SinkOutcome};
pub use loader::{BatchLoader, BatchOutcome};
pub use normalizer::{Rejection, RejectionReason, RowNormalizer};
pub use reader::{ReadError, RecordReader};
pub use stats::ImportSummary;
pub use timezone::{FixedOffsetConverter, TimeConverter, ZoneConverter};
