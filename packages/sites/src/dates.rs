//! Date parsing for event listings.

use chrono::NaiveDate;

/// Formats tried, in order, against the visible text of a date cell.
const VISIBLE_FORMATS: &[&str] = &["%b %d, %Y", "%B %d, %Y", "%Y-%m-%d"];

/// Parses an ISO date or datetime, keeping only the date.
///
/// Accepts `2024-01-05`, `2024-01-05T10:00:00` and `2024-01-05 10:00`.
#[must_use]
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let token = text.split_whitespace().next()?;
    let date_part = token.split('T').next().unwrap_or(token);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parses the visible text of a listing date cell.
///
/// Trailing text after a recognized date (e.g. a time) is ignored.
#[must_use]
pub fn parse_visible_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    VISIBLE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_and_remainder(text, fmt)
            .ok()
            .map(|(date, _)| date)
    })
}

/// Parses a date cell, preferring the hidden ISO value over visible text.
#[must_use]
pub fn parse_cell_date(hidden: Option<&str>, visible: &str) -> Option<NaiveDate> {
    hidden
        .and_then(parse_iso_date)
        .or_else(|| parse_visible_date(visible))
}

/// Formats a date as `YYYY-MM-DD`, or `""` when absent.
#[must_use]
pub fn to_iso(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
