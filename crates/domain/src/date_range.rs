//! Inclusive date ranges and the two wire date formats (spec §9 (iii)).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use booking_core::BookingError;

/// An inclusive `[start, end]` span of calendar days.
///
/// Hotel and car reservations carry one of these; train seats don't (they
/// have no date dimension at all, see `ResourceKind::has_date_range`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BookingError> {
        if end < start {
            return Err(BookingError::validation(format!(
                "end date {end} is before start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Every calendar day in the range, inclusive on both ends.
    ///
    /// A single-day reservation (`start == end`) yields exactly one day.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Saga wire format: `DD-MM-YYYY` (spec §4.1, §6.1).
pub fn parse_ddmmyyyy(s: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(s, "%d-%m-%Y")
        .map_err(|e| BookingError::validation(format!("invalid date '{s}' (want DD-MM-YYYY): {e}")))
}

/// 2PC wire format: `YYYY-MM-DD` (spec §4.4, §6.1).
pub fn parse_iso(s: &str) -> Result<NaiveDate, BookingError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| BookingError::validation(format!("invalid date '{s}' (want YYYY-MM-DD): {e}")))
}

pub fn format_ddmmyyyy(d: NaiveDate) -> String {
    d.format("%d-%m-%Y").to_string()
}

pub fn format_iso(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_day_range_has_exactly_one_day() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let range = DateRange::new(d, d).unwrap();
        assert_eq!(range.days().count(), 1);
        assert_eq!(range.day_count(), 1);
    }

    #[test]
    fn multi_day_range_is_inclusive_both_ends() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let range = DateRange::new(start, end).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(days, vec![start, end]);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(DateRange::new(start, end).is_err());
    }

    #[test]
    fn saga_date_format_is_ddmmyyyy() {
        let parsed = parse_ddmmyyyy("01-03-2025").unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert!(parse_ddmmyyyy("2025-03-01").is_err());
    }

    #[test]
    fn twopc_date_format_is_iso() {
        let parsed = parse_iso("2025-03-01").unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert!(parse_iso("01-03-2025").is_err());
    }
}
