use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

// ===== Input Models =====

/// One trip row as parsed from the input file.
///
/// Every field is optional because the source file is untrusted; validation
/// happens in [`crate::import::normalizer`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// 1-based line number in the source file, used in messages.
    pub line: u64,
    pub pickup_datetime: Option<NaiveDateTime>,
    pub dropoff_datetime: Option<NaiveDateTime>,
    pub passenger_count: Option<i16>,
    pub trip_distance: Option<Decimal>,
    pub store_and_fwd_flag: Option<String>,
    pub pu_location_id: Option<i32>,
    pub do_location_id: Option<i32>,
    pub fare_amount: Option<Decimal>,
    pub tip_amount: Option<Decimal>,
}

// ===== Canonical Models =====

/// Store-and-forward flag as persisted in the `store_and_fwd_flag` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StoreAndFwdFlag {
    Yes,
    No,
}

impl StoreAndFwdFlag {
    /// Parse the single-letter source token (`Y`/`N`, case-insensitive, trimmed).
    pub fn from_source(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "Y" => Some(StoreAndFwdFlag::Yes),
            "N" => Some(StoreAndFwdFlag::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreAndFwdFlag::Yes => "Yes",
            StoreAndFwdFlag::No => "No",
        }
    }
}

impl fmt::Display for StoreAndFwdFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, normalized trip ready for persistence.
///
/// Timestamps are UTC. Numeric fields are already defaulted, so nothing
/// downstream re-validates a canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    /// Source line the record came from.
    #[serde(skip)]
    pub line: u64,
    pub pickup_datetime: DateTime<Utc>,
    pub dropoff_datetime: DateTime<Utc>,
    pub passenger_count: i16,
    pub trip_distance: Decimal,
    pub store_and_fwd_flag: StoreAndFwdFlag,
    pub pu_location_id: Option<i32>,
    pub do_location_id: Option<i32>,
    pub fare_amount: Decimal,
    pub tip_amount: Decimal,
}

/// Column names shared by the input file, the duplicates file and the
/// `trips` table.
pub mod columns {
    pub const PICKUP_DATETIME: &str = "tpep_pickup_datetime";
    pub const DROPOFF_DATETIME: &str = "tpep_dropoff_datetime";
    pub const PASSENGER_COUNT: &str = "passenger_count";
    pub const TRIP_DISTANCE: &str = "trip_distance";
    pub const STORE_AND_FWD_FLAG: &str = "store_and_fwd_flag";
    pub const PU_LOCATION_ID: &str = "PULocationID";
    pub const DO_LOCATION_ID: &str = "DOLocationID";
    pub const FARE_AMOUNT: &str = "fare_amount";
    pub const TIP_AMOUNT: &str = "tip_amount";

    pub const ALL: [&str; 9] = [
        PICKUP_DATETIME,
        DROPOFF_DATETIME,
        PASSENGER_COUNT,
        TRIP_DISTANCE,
        STORE_AND_FWD_FLAG,
        PU_LOCATION_ID,
        DO_LOCATION_ID,
        FARE_AMOUNT,
        TIP_AMOUNT,
    ];
}
