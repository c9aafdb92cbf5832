//! Duplicates side file.
//!
//! Rows dropped as duplicates are written, already normalized, to a CSV file
//! with the same columns as the input. A failure here never fails the run.
//! Timestamps are written as RFC3339 UTC, so re-importing the file needs
//! `TRIPS_DATETIME_FORMATS` to include `%Y-%m-%dT%H:%M:%S%.3fZ` and
//! `TRIPS_SOURCE_TIMEZONE=UTC`.

use crate::models::{CanonicalRecord, columns};
use chrono::SecondsFormat;
use csv::WriterBuilder;
use std::path::{Path, PathBuf};

/// What happened when the sink was asked to persist duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    /// Nothing to write; no file was touched.
    NoDuplicates,
    Written { path: PathBuf, count: usize },
    Failed { path: PathBuf, error: String },
}

/// Writes duplicate rows to a fixed file, replacing any previous one.
pub struct DuplicateSink {
    path: PathBuf,
    delimiter: u8,
}

impl DuplicateSink {
    pub fn new(path: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, duplicates: &[CanonicalRecord]) -> SinkOutcome {
        if duplicates.is_empty() {
            log::info!("no duplicates detected");
            return SinkOutcome::NoDuplicates;
        }

        match self.write_file(duplicates) {
            Ok(()) => {
                log::info!(
                    "wrote {} duplicates to {}",
                    duplicates.len(),
                    self.path.display()
                );
                SinkOutcome::Written {
                    path: self.path.clone(),
                    count: duplicates.len(),
                }
            }
            Err(err) => {
                log::warn!(
                    "failed to write duplicates to {}: {}",
                    self.path.display(),
                    err
                );
                SinkOutcome::Failed {
                    path: self.path.clone(),
                    error: err.to_string(),
                }
            }
        }
    }

    fn write_file(&self, duplicates: &[CanonicalRecord]) -> Result<(), csv::Error> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&self.path)?;

        writer.write_record(columns::ALL)?;
        for record in duplicates {
            writer.write_record(to_fields(record))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn to_fields(record: &CanonicalRecord) -> [String; 9] {
    let optional = |value: Option<i32>| value.map(|v| v.to_string()).unwrap_or_default();
    [
        record
            .pickup_datetime
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        record
            .dropoff_datetime
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        record.passenger_count.to_string(),
        record.trip_distance.to_string(),
        record.store_and_fwd_flag.to_string(),
        optional(record.pu_location_id),
        optional(record.do_location_id),
        record.fare_amount.to_string(),
        record.tip_amount.to_string(),
    ]
}
