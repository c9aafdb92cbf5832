//! Row validation and normalization.
//!
//! Turns a [`RawRecord`] into a [`CanonicalRecord`] or a [`Rejection`]. A
//! rejection is an ordinary outcome; the caller records it and moves on.

use crate::import::timezone::TimeConverter;
use crate::models::{CanonicalRecord, RawRecord, StoreAndFwdFlag};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

/// Why a row was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    MissingTimestamp {
        pickup: Option<NaiveDateTime>,
        dropoff: Option<NaiveDateTime>,
    },
    InvalidFlag(Option<String>),
}

/// A row that failed validation, tied to its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub line: u64,
    pub reason: RejectionReason,
}

fn describe(value: Option<NaiveDateTime>) -> String {
    value
        .map(|ts| ts.to_string())
        .unwrap_or_else(|| "<missing>".to_string())
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectionReason::MissingTimestamp { pickup, dropoff } => write!(
                f,
                "line {}: skipped, missing pickup/dropoff datetime (pickup={}, dropoff={})",
                self.line,
                describe(*pickup),
                describe(*dropoff)
            ),
            RejectionReason::InvalidFlag(flag) => write!(
                f,
                "line {}: skipped, invalid store_and_fwd_flag '{}'",
                self.line,
                flag.as_deref().unwrap_or("")
            ),
        }
    }
}

/// Validates raw rows and converts their timestamps to UTC.
pub struct RowNormalizer<C> {
    converter: C,
}

impl<C: TimeConverter> RowNormalizer<C> {
    pub fn new(converter: C) -> Self {
        Self { converter }
    }

    /// Normalize one row.
    ///
    /// Rules, in order: trim the flag; require both timestamps; require the
    /// flag to be `Y` or `N`; convert timestamps to UTC; default absent
    /// numerics to zero. Location ids stay optional.
    pub fn normalize(&self, raw: &RawRecord) -> Result<CanonicalRecord, Rejection> {
        let flag = raw
            .store_and_fwd_flag
            .as_deref()
            .map(str::trim)
            .map(str::to_string);

        let (Some(pickup), Some(dropoff)) = (raw.pickup_datetime, raw.dropoff_datetime) else {
            return Err(Rejection {
                line: raw.line,
                reason: RejectionReason::MissingTimestamp {
                    pickup: raw.pickup_datetime,
                    dropoff: raw.dropoff_datetime,
                },
            });
        };

        let Some(store_and_fwd_flag) = flag.as_deref().and_then(StoreAndFwdFlag::from_source)
        else {
            return Err(Rejection {
                line: raw.line,
                reason: RejectionReason::InvalidFlag(flag),
            });
        };

        Ok(CanonicalRecord {
            line: raw.line,
            pickup_datetime: self.converter.to_utc(pickup),
            dropoff_datetime: self.converter.to_utc(dropoff),
            passenger_count: raw.passenger_count.unwrap_or(0),
            trip_distance: raw.trip_distance.unwrap_or(Decimal::ZERO),
            store_and_fwd_flag,
            pu_location_id: raw.pu_location_id,
            do_location_id: raw.do_location_id,
            fare_amount: raw.fare_amount.unwrap_or(Decimal::ZERO),
            tip_amount: raw.tip_amount.unwrap_or(Decimal::ZERO),
        })
    }
}
