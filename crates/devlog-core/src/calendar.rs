//! Calendar-day helpers
//!
//! Days travel as `YYYY-MM-DD` strings everywhere; lexicographic order on
//! that form is chronological order.

use chrono::{NaiveDate, Utc};

pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` day
///
/// Rejects impossible dates (`2024-02-30`) and non-canonical spellings
/// (`2024-1-5`), so a parsed day always formats back to the same string.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(value, DAY_FORMAT).ok()?;
    (format_day(date) == value).then_some(date)
}

pub fn format_day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

/// Current UTC day
pub fn today() -> String {
    format_day(Utc::now().date_naive())
}
