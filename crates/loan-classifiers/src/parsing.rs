//! Field-level conversions for raw loan values.
//!
//! Loan exports carry dates at month granularity ("Jun-2007") and rates as
//! percentage strings ("13.49%"). Every conversion here is strict: a value
//! that is present but malformed is an error, never a silent zero.
use chrono::{Datelike, NaiveDate};

use crate::error::ParseError;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parse a "Mon-YYYY" value into the first day of that month.
///
/// Surrounding whitespace is ignored and the month abbreviation is matched
/// case-insensitively. The year must have exactly four digits.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let invalid = || ParseError::InvalidDate(raw.to_string());

    let (month_part, year_part) = trimmed.split_once('-').ok_or_else(invalid)?;
    let month = MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(month_part))
        .ok_or_else(invalid)?;

    if year_part.len() != 4 || !year_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: i32 = year_part.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month as u32 + 1, 1).ok_or_else(invalid)
}

/// Parse a percentage string such as "13.49%" or " 9.0 %" into 13.49 / 9.0.
///
/// A single trailing '%' is optional so already-numeric values pass through.
pub fn parse_percent(raw: &str) -> Result<f64, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match number.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidPercent(raw.to_string())),
    }
}

/// Parse a plain numeric field. Non-finite spellings ("NaN", "inf") are rejected.
pub fn parse_number(raw: &str) -> Result<f64, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::InvalidNumber(raw.to_string())),
    }
}

/// Whole calendar months from `start` to `end` (negative when `end` is earlier).
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end.year() as i64 - start.year() as i64) * 12 + (end.month() as i64 - start.month() as i64)
}
