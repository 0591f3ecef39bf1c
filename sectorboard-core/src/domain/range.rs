use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Inclusive calendar date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawRange> for DateRange {
    type Error = RangeError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, RangeError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| RangeError::BadDate(s.to_string()))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    BadDate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn inclusive_on_both_ends() {
        let r = DateRange::new(d(2021, 1, 4), d(2021, 1, 6)).unwrap();
        assert!(r.contains(d(2021, 1, 4)));
        assert!(r.contains(d(2021, 1, 6)));
        assert!(!r.contains(d(2021, 1, 7)));
    }

    #[test]
    fn single_day_range_is_valid() {
        assert!(DateRange::new(d(2021, 1, 4), d(2021, 1, 4)).is_ok());
    }

    #[test]
    fn inverted_range_rejected() {
        let err = DateRange::new(d(2021, 1, 6), d(2021, 1, 4)).unwrap_err();
        assert!(matches!(err, RangeError::Inverted { .. }));
    }

    #[test]
    fn parse_reports_bad_date() {
        let err = DateRange::parse("2021-13-01", "2021-12-31").unwrap_err();
        assert_eq!(err, RangeError::BadDate("2021-13-01".into()));
    }

    #[test]
    fn deserialize_validates_order() {
        let ok: Result<DateRange, _> = toml::from_str("start = \"2015-01-01\"\nend = \"2020-12-31\"\n");
        assert!(ok.is_ok());
        let bad: Result<DateRange, _> = toml::from_str("start = \"2021-01-01\"\nend = \"2020-12-31\"\n");
        assert!(bad.is_err());
    }
}
