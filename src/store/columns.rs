//! Columnar batch layout for bulk inserts.
//!
//! Holds a batch of trips as parallel vectors, one per destination column,
//! ready to be bound as PostgreSQL arrays and expanded with UNNEST.

use crate::models::CanonicalRecord;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Prepared trip data for bulk insertion.
///
/// All vectors have the same length. Each index is one trip.
#[derive(Debug, Default)]
pub struct TripColumns {
    pub pickup_datetimes: Vec<DateTime<Utc>>,
    pub dropoff_datetimes: Vec<DateTime<Utc>>,
    pub passenger_counts: Vec<i16>,
    pub trip_distances: Vec<Decimal>,
    pub store_and_fwd_flags: Vec<String>,
    pub pu_location_ids: Vec<Option<i32>>,
    pub do_location_ids: Vec<Option<i32>>,
    pub fare_amounts: Vec<Decimal>,
    pub tip_amounts: Vec<Decimal>,
}

impl TripColumns {
    pub fn from_records(records: &[CanonicalRecord]) -> Self {
        let mut columns = Self::with_capacity(records.len());
        for record in records {
            columns.push(record);
        }
        columns
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            pickup_datetimes: Vec::with_capacity(capacity),
            dropoff_datetimes: Vec::with_capacity(capacity),
            passenger_counts: Vec::with_capacity(capacity),
            trip_distances: Vec::with_capacity(capacity),
            store_and_fwd_flags: Vec::with_capacity(capacity),
            pu_location_ids: Vec::with_capacity(capacity),
            do_location_ids: Vec::with_capacity(capacity),
            fare_amounts: Vec::with_capacity(capacity),
            tip_amounts: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: &CanonicalRecord) {
        self.pickup_datetimes.push(record.pickup_datetime);
        self.dropoff_datetimes.push(record.dropoff_datetime);
        self.passenger_counts.push(record.passenger_count);
        self.trip_distances.push(record.trip_distance);
        self.store_and_fwd_flags
            .push(record.store_and_fwd_flag.as_str().to_string());
        self.pu_location_ids.push(record.pu_location_id);
        self.do_location_ids.push(record.do_location_id);
        self.fare_amounts.push(record.fare_amount);
        self.tip_amounts.push(record.tip_amount);
    }

    pub fn len(&self) -> usize {
        self.pickup_datetimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickup_datetimes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoreAndFwdFlag;
    use chrono::NaiveDate;

    #[test]
    fn test_columns_stay_aligned() {
        let pickup = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(5, 0, 0)
            .unwrap()
            .and_utc();
        let record = CanonicalRecord {
            line: 2,
            pickup_datetime: pickup,
            dropoff_datetime: pickup,
            passenger_count: 1,
            trip_distance: Decimal::ONE,
            store_and_fwd_flag: StoreAndFwdFlag::Yes,
            pu_location_id: None,
            do_location_id: Some(4),
            fare_amount: Decimal::TEN,
            tip_amount: Decimal::ZERO,
        };

        let columns = TripColumns::from_records(&[record.clone(), record]);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns.store_and_fwd_flags, vec!["Yes", "Yes"]);
        assert_eq!(columns.pu_location_ids, vec![None, None]);
        assert_eq!(columns.do_location_ids, vec![Some(4), Some(4)]);
        assert_eq!(columns.tip_amounts.len(), 2);
        assert!(!columns.is_empty());
        assert!(TripColumns::from_records(&[]).is_empty());
    }
}
