//! CSV record reader.
//!
//! Loads the whole input file into memory as [`RawRecord`]s. Any structural
//! problem with the file (missing, wrong extension, bad header, unparseable
//! value) rejects the entire file before a single row is processed.

use crate::config::ReaderOptions;
use crate::models::{RawRecord, columns};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Reasons an input file is rejected as a whole.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("file path must be provided")]
    MissingPath,
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("file must have a .csv extension: {0}")]
    Extension(PathBuf),
    #[error("file is empty: {0}")]
    Empty(PathBuf),
    #[error("file does not contain a header")]
    MissingHeader,
    #[error("header does not use the expected '{0}' delimiter")]
    Delimiter(char),
    #[error("header is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("line {line}, column {column}: cannot parse '{value}' as {expected}")]
    Field {
        line: u64,
        column: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Column positions resolved from the header row.
struct HeaderIndex {
    positions: HashMap<&'static str, usize>,
}

impl HeaderIndex {
    fn resolve(headers: &StringRecord) -> Result<Self, ReadError> {
        let mut positions = HashMap::new();
        let mut missing = Vec::new();

        for column in columns::ALL {
            match headers.iter().position(|header| header.trim() == column) {
                Some(index) => {
                    positions.insert(column, index);
                }
                None => missing.push(column.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(ReadError::MissingColumns(missing));
        }
        Ok(Self { positions })
    }

    fn field<'r>(&self, record: &'r StringRecord, column: &'static str) -> Option<&'r str> {
        self.positions
            .get(column)
            .and_then(|index| record.get(*index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Parses trip CSV files into raw records.
pub struct RecordReader {
    options: ReaderOptions,
}

impl RecordReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    /// Validate and read every record of the file at `path`, in file order.
    pub fn read(&self, path: &Path) -> Result<Vec<RawRecord>, ReadError> {
        if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
            return Err(ReadError::MissingPath);
        }
        if !path.is_file() {
            return Err(ReadError::NotFound(path.to_path_buf()));
        }

        let has_csv_extension = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !has_csv_extension {
            return Err(ReadError::Extension(path.to_path_buf()));
        }

        if std::fs::metadata(path)?.len() == 0 {
            return Err(ReadError::Empty(path.to_path_buf()));
        }

        let mut first_line = String::new();
        BufReader::new(File::open(path)?).read_line(&mut first_line)?;
        self.check_header_line(&first_line)?;

        let records = self.read_from(File::open(path)?)?;
        log::info!("read {} records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Parse records from any reader whose first line is the header.
    pub fn read_from<R: Read>(&self, input: R) -> Result<Vec<RawRecord>, ReadError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(true)
            .trim(Trim::Headers)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let index = HeaderIndex::resolve(&headers)?;

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);
            records.push(self.parse_record(&index, &record, line)?);
        }
        Ok(records)
    }

    fn check_header_line(&self, line: &str) -> Result<(), ReadError> {
        if line.trim().is_empty() {
            return Err(ReadError::MissingHeader);
        }
        let delimiter = char::from(self.options.delimiter);
        if !line.contains(delimiter) {
            return Err(ReadError::Delimiter(delimiter));
        }
        Ok(())
    }

    fn parse_record(
        &self,
        index: &HeaderIndex,
        record: &StringRecord,
        line: u64,
    ) -> Result<RawRecord, ReadError> {
        Ok(RawRecord {
            line,
            pickup_datetime: self.datetime(index, record, line, columns::PICKUP_DATETIME)?,
            dropoff_datetime: self.datetime(index, record, line, columns::DROPOFF_DATETIME)?,
            passenger_count: parse_value(index, record, line, columns::PASSENGER_COUNT, "integer")?,
            trip_distance: parse_value(index, record, line, columns::TRIP_DISTANCE, "decimal")?,
            store_and_fwd_flag: index
                .field(record, columns::STORE_AND_FWD_FLAG)
                .map(str::to_string),
            pu_location_id: parse_value(index, record, line, columns::PU_LOCATION_ID, "integer")?,
            do_location_id: parse_value(index, record, line, columns::DO_LOCATION_ID, "integer")?,
            fare_amount: parse_value::<Decimal>(index, record, line, columns::FARE_AMOUNT, "decimal")?,
            tip_amount: parse_value::<Decimal>(index, record, line, columns::TIP_AMOUNT, "decimal")?,
        })
    }

    fn datetime(
        &self,
        index: &HeaderIndex,
        record: &StringRecord,
        line: u64,
        column: &'static str,
    ) -> Result<Option<NaiveDateTime>, ReadError> {
        let Some(value) = index.field(record, column) else {
            return Ok(None);
        };

        self.options
            .datetime_formats
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(Some)
            .ok_or_else(|| ReadError::Field {
                line,
                column,
                value: value.to_string(),
                expected: "timestamp",
            })
    }
}

fn parse_value<T: FromStr>(
    index: &HeaderIndex,
    record: &StringRecord,
    line: u64,
    column: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ReadError> {
    let Some(value) = index.field(record, column) else {
        return Ok(None);
    };
    value.parse::<T>().map(Some).map_err(|_| ReadError::Field {
        line,
        column,
        value: value.to_string(),
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    const HEADER: &str = "tpep_pickup_datetime,tpep_dropoff_datetime,passenger_count,trip_distance,store_and_fwd_flag,PULocationID,DOLocationID,fare_amount,tip_amount\n";

    fn reader() -> RecordReader {
        RecordReader::new(ReaderOptions::default())
    }

    #[test]
    fn test_read_full_row() {
        let csv = format!(
            "{HEADER}01/01/2020 12:28:15 AM,01/01/2020 12:33:03 AM,1,1.20, n ,238,239,6.00,1.47\n"
        );
        let records = reader().read_from(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.line, 2);
        assert_eq!(
            record.pickup_datetime,
            Some(
                NaiveDate::from_ymd_opt(2020, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 28, 15)
                    .unwrap()
            )
        );
        assert_eq!(record.passenger_count, Some(1));
        assert_eq!(record.trip_distance, Some(Decimal::new(120, 2)));
        assert_eq!(record.store_and_fwd_flag.as_deref(), Some("n"));
        assert_eq!(record.pu_location_id, Some(238));
        assert_eq!(record.fare_amount, Some(Decimal::new(600, 2)));
        assert_eq!(record.tip_amount, Some(Decimal::new(147, 2)));
    }

    #[test]
    fn test_empty_fields_are_absent() {
        let csv = format!("{HEADER}01/01/2020 12:28:15 AM,,,,,,,,\n");
        let records = reader().read_from(csv.as_bytes()).unwrap();
        assert_eq!(records[0].dropoff_datetime, None);
        assert_eq!(records[0].passenger_count, None);
        assert_eq!(records[0].store_and_fwd_flag, None);
        assert_eq!(records[0].fare_amount, None);
    }

    #[test]
    fn test_header_only_yields_nothing() {
        let records = reader().read_from(HEADER.as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_missing_columns_rejected() {
        let csv = "tpep_pickup_datetime,tpep_dropoff_datetime\n";
        match reader().read_from(csv.as_bytes()) {
            Err(ReadError::MissingColumns(missing)) => {
                assert_eq!(missing.len(), 7);
                assert!(missing.contains(&"PULocationID".to_string()));
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_value_names_line_and_column() {
        let csv = format!("{HEADER}01/01/2020 12:28:15 AM,01/01/2020 12:33:03 AM,lots,1,N,1,1,1,1\n");
        match reader().read_from(csv.as_bytes()) {
            Err(ReadError::Field { line, column, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(column, columns::PASSENGER_COUNT);
            }
            other => panic!("expected field error, got {other:?}"),
        }
    }

    #[test]
    fn test_file_level_checks() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("nope.csv");
        assert!(matches!(reader().read(&missing), Err(ReadError::NotFound(_))));

        let txt = dir.path().join("trips.txt");
        std::fs::write(&txt, HEADER).unwrap();
        assert!(matches!(reader().read(&txt), Err(ReadError::Extension(_))));

        let empty = dir.path().join("empty.CSV");
        File::create(&empty).unwrap();
        assert!(matches!(reader().read(&empty), Err(ReadError::Empty(_))));

        let semicolons = dir.path().join("semi.csv");
        let mut file = File::create(&semicolons).unwrap();
        writeln!(file, "a;b;c").unwrap();
        assert!(matches!(reader().read(&semicolons), Err(ReadError::Delimiter(','))));

        let blank = dir.path().join("blank.csv");
        std::fs::write(&blank, "\n\n").unwrap();
        assert!(matches!(reader().read(&blank), Err(ReadError::MissingHeader)));

        assert!(matches!(reader().read(Path::new("")), Err(ReadError::MissingPath)));
    }
}
