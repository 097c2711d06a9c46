//! Row validation: required fields present, parseable date, positive amount.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::{CsvRow, ValidRow};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|dt| dt.date())
}

/// Parse an amount cell, tolerating a leading `$` and thousands separators
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validate a raw row. Returns `None` when any required field is missing,
/// the date does not parse, or the amount is not a positive number.
pub fn validate_row(row: &CsvRow) -> Option<ValidRow> {
    if row.date.trim().is_empty() || row.description.trim().is_empty() || row.amount.trim().is_empty() {
        return None;
    }

    let date = parse_date(&row.date)?;
    let amount = parse_amount(&row.amount).filter(|a| *a > 0.0)?;

    Some(ValidRow {
        date,
        description: row.description.trim().to_string(),
        amount,
        category: row.category.clone(),
    })
}
