//! Import statistics tracking.
//!
//! Tracks row outcomes for one import run.

use crate::import::loader::BatchOutcome;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of a single import run.
///
/// Every input row ends up in exactly one of `inserted`, `duplicates` or
/// `rejected`, so the three always sum to `total_rows` once the run is done.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    /// Number of data rows read from the input file
    pub total_rows: usize,
    /// Number of trips that reached the destination store
    pub inserted: usize,
    /// Number of rows dropped as within-run duplicates
    pub duplicates: usize,
    /// Rows rejected by validation plus rows whose individual insert failed
    pub rejected: usize,
    /// One message per rejected row, in input order
    pub errors: Vec<String>,
    /// Non-fatal problems that did not affect row accounting
    pub warnings: Vec<String>,
    /// Side file the duplicates were written to, if any
    pub duplicates_file: Option<PathBuf>,
}

impl ImportSummary {
    /// Record a row that will not be inserted.
    pub fn record_rejection(&mut self, message: impl Into<String>) {
        self.rejected += 1;
        self.errors.push(message.into());
    }

    /// Fold the result of loading one batch into the run totals.
    pub fn merge(&mut self, outcome: BatchOutcome) {
        self.inserted += outcome.inserted;
        self.rejected += outcome.failures.len();
        self.errors.extend(outcome.failures);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Whether every row read has been accounted for exactly once.
    pub fn is_balanced(&self) -> bool {
        self.inserted + self.duplicates + self.rejected == self.total_rows
    }
}
