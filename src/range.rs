use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::ReportError;

/// Hours added to a stored UTC timestamp to obtain the local (Baghdad) day.
pub const LOCAL_OFFSET_HOURS: i64 = 3;

pub fn to_local_day(timestamp: DateTime<Utc>) -> NaiveDate {
    (timestamp + Duration::hours(LOCAL_OFFSET_HOURS)).date_naive()
}

pub fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc() - Duration::hours(LOCAL_OFFSET_HOURS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn parse(from: &str, to: &str) -> Result<Self, ReportError> {
        Ok(Self {
            from: parse_day(from)?,
            to: parse_day(to)?,
        })
    }

    /// Half-open UTC bounds `[start, end)` covering every local day of the range.
    pub fn utc_bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ReportError> {
        let after = self
            .to
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| ReportError::BadDateRange(format!("{} is out of range", self.to)))?;
        Ok((local_midnight(self.from), local_midnight(after)))
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let day = to_local_day(timestamp);
        self.from <= day && day <= self.to
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_to_{}", self.from, self.to)
    }
}

fn parse_day(value: &str) -> Result<NaiveDate, ReportError> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());

    if !shaped {
        return Err(ReportError::BadDateRange(format!(
            "expected YYYY-MM-DD, got {value:?}"
        )));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ReportError::BadDateRange(format!("{value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn late_utc_evening_belongs_to_next_local_day() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 10, 21, 0, 0).unwrap();
        assert_eq!(to_local_day(ts), day(2024, 1, 11));

        let ts = Utc.with_ymd_and_hms(2024, 1, 10, 20, 59, 59).unwrap();
        assert_eq!(to_local_day(ts), day(2024, 1, 10));
    }

    #[test]
    fn single_day_range_matches_only_that_local_day() {
        let range = DateRange::parse("2024-01-10", "2024-01-10").unwrap();

        assert!(range.contains(Utc.with_ymd_and_hms(2024, 1, 9, 21, 0, 0).unwrap()));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 1, 10, 20, 59, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 1, 10, 21, 0, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 1, 9, 20, 59, 0).unwrap()));
    }

    #[test]
    fn utc_bounds_are_shifted_by_offset() {
        let range = DateRange::parse("2024-01-10", "2024-01-12").unwrap();
        let (start, end) = range.utc_bounds().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 9, 21, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 12, 21, 0, 0).unwrap());
    }

    #[test]
    fn rejects_malformed_days() {
        for bad in ["not-a-date", "", "2024-1-10", "2024/01/10", "2024-02-30", " 2024-01-10"] {
            let err = DateRange::parse(bad, "2024-01-10").unwrap_err();
            assert!(matches!(err, ReportError::BadDateRange(_)), "{bad}");
        }
    }

    #[test]
    fn display_embeds_both_days() {
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        assert_eq!(range.to_string(), "2024-01-01_to_2024-01-31");
    }
}
