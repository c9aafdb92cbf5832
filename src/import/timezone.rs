//! Wall-clock to UTC conversion.
//!
//! Source timestamps carry no offset; they are local time in the source
//! system's zone. Ambiguous and nonexistent local times (DST transitions) are
//! both resolved with the zone's standard offset.

use crate::error::ImportError;
use chrono::{DateTime, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};

/// Converts a naive local timestamp into an absolute UTC instant.
pub trait TimeConverter {
    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc>;
}

/// Converter backed by the compiled-in IANA database.
#[derive(Debug, Clone, Copy)]
pub struct ZoneConverter {
    zone: Tz,
}

impl ZoneConverter {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// Look up a zone by IANA name, e.g. `America/New_York`.
    pub fn from_name(name: &str) -> Result<Self, ImportError> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| ImportError::config(format!("unknown time zone '{}'", name)))
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    fn standard_offset_near(&self, local: NaiveDateTime) -> chrono::Duration {
        // base_utc_offset is the zone's standard offset regardless of whether
        // DST is in effect at the probed instant.
        self.zone.offset_from_utc_datetime(&local).base_utc_offset()
    }
}

impl TimeConverter for ZoneConverter {
    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self.zone.from_local_datetime(&local) {
            LocalResult::Single(resolved) => resolved.with_timezone(&Utc),
            LocalResult::Ambiguous(first, second) => {
                if first.offset().dst_offset() == chrono::Duration::zero() {
                    first.with_timezone(&Utc)
                } else {
                    second.with_timezone(&Utc)
                }
            }
            LocalResult::None => (local - self.standard_offset_near(local)).and_utc(),
        }
    }
}

/// Converter for sources recorded at a fixed offset (including UTC).
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetConverter {
    offset: FixedOffset,
}

impl FixedOffsetConverter {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }
}

impl TimeConverter for FixedOffsetConverter {
    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        (local - chrono::Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn new_york() -> ZoneConverter {
        ZoneConverter::from_name("America/New_York").unwrap()
    }

    #[test]
    fn test_winter_and_summer_offsets() {
        let converter = new_york();
        assert_eq!(
            converter.to_utc(at(2020, 1, 1, 0, 28, 15)),
            at(2020, 1, 1, 5, 28, 15).and_utc()
        );
        assert_eq!(
            converter.to_utc(at(2020, 7, 1, 12, 0, 0)),
            at(2020, 7, 1, 16, 0, 0).and_utc()
        );
    }

    #[test]
    fn test_ambiguous_fall_back_uses_standard_time() {
        // 2020-11-01 01:30 happens twice in New York.
        let converter = new_york();
        assert_eq!(
            converter.to_utc(at(2020, 11, 1, 1, 30, 0)),
            at(2020, 11, 1, 6, 30, 0).and_utc()
        );
    }

    #[test]
    fn test_nonexistent_spring_forward_uses_standard_time() {
        // 2020-03-08 02:30 never happens in New York.
        let converter = new_york();
        assert_eq!(
            converter.to_utc(at(2020, 3, 8, 2, 30, 0)),
            at(2020, 3, 8, 7, 30, 0).and_utc()
        );
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let converter = new_york();
        let local = at(2019, 11, 3, 1, 15, 0);
        assert_eq!(converter.to_utc(local), converter.to_utc(local));
    }

    #[test]
    fn test_unknown_zone_is_config_error() {
        assert!(matches!(
            ZoneConverter::from_name("Mars/Olympus_Mons"),
            Err(ImportError::Config(_))
        ));
    }

    #[test]
    fn test_fixed_offset() {
        let converter = FixedOffsetConverter::new(FixedOffset::west_opt(5 * 3600).unwrap());
        assert_eq!(
            converter.to_utc(at(2020, 7, 1, 12, 0, 0)),
            at(2020, 7, 1, 17, 0, 0).and_utc()
        );
        assert_eq!(
            FixedOffsetConverter::utc().to_utc(at(2020, 7, 1, 12, 0, 0)),
            at(2020, 7, 1, 12, 0, 0).and_utc()
        );
    }
}
