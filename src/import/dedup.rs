//! Within-run duplicate detection.
//!
//! Identity is (pickup, dropoff, passenger count) of the canonical record;
//! every other column is ignored. The first occurrence of a key wins.

use crate::models::CanonicalRecord;
use chrono::SecondsFormat;
use std::collections::HashSet;
use std::fmt;

/// Textual identity of a trip for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn from_record(record: &CanonicalRecord) -> Self {
        DedupKey(format!(
            "{}_{}_{}",
            record
                .pickup_datetime
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            record
                .dropoff_datetime
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            record.passenger_count
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Fresh,
    Duplicate,
}

/// Set of keys seen so far in one run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<DedupKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, record: &CanonicalRecord) -> Classification {
        if self.seen.insert(DedupKey::from_record(record)) {
            Classification::Fresh
        } else {
            Classification::Duplicate
        }
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoreAndFwdFlag;
    use chrono::{NaiveDate, Utc, DateTime};
    use rust_decimal::Decimal;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
            .and_utc()
    }

    fn record(pickup: DateTime<Utc>, passengers: i16, fare: i64) -> CanonicalRecord {
        CanonicalRecord {
            line: 2,
            pickup_datetime: pickup,
            dropoff_datetime: utc(23, 0),
            passenger_count: passengers,
            trip_distance: Decimal::ONE,
            store_and_fwd_flag: StoreAndFwdFlag::No,
            pu_location_id: Some(1),
            do_location_id: Some(2),
            fare_amount: Decimal::new(fare, 2),
            tip_amount: Decimal::ZERO,
        }
    }

    #[test]
    fn test_key_ignores_non_key_columns() {
        let a = record(utc(10, 0), 1, 500);
        let mut b = record(utc(10, 0), 1, 999);
        b.trip_distance = Decimal::new(4200, 2);
        b.store_and_fwd_flag = StoreAndFwdFlag::Yes;
        assert_eq!(DedupKey::from_record(&a), DedupKey::from_record(&b));
    }

    #[test]
    fn test_key_format() {
        let key = DedupKey::from_record(&record(utc(10, 0), 3, 500));
        assert_eq!(
            key.as_str(),
            "2020-01-01T10:00:00.000000000Z_2020-01-01T23:00:00.000000000Z_3"
        );
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut dedup = Deduplicator::new();
        assert_eq!(dedup.classify(&record(utc(10, 0), 1, 500)), Classification::Fresh);
        assert_eq!(dedup.classify(&record(utc(10, 0), 1, 700)), Classification::Duplicate);
        assert_eq!(dedup.classify(&record(utc(10, 0), 2, 500)), Classification::Fresh);
        assert_eq!(dedup.classify(&record(utc(10, 1), 1, 500)), Classification::Fresh);
        assert_eq!(dedup.len(), 3);
    }

    #[test]
    fn test_runs_do_not_share_keys() {
        let mut first = Deduplicator::new();
        first.classify(&record(utc(10, 0), 1, 500));
        let mut second = Deduplicator::new();
        assert!(second.is_empty());
        assert_eq!(second.classify(&record(utc(10, 0), 1, 500)), Classification::Fresh);
    }
}
