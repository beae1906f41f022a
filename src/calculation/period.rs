//! Period extraction from transaction file headers.
//!
//! Transaction exports carry a free-text caption such as
//! `"Продажи с 01.03 по 15.03.2025 г."` near the top of the sheet.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use tracing::debug;

use crate::models::{Period, Sheet};

/// Number of leading rows scanned for a period caption.
pub const PERIOD_SCAN_ROWS: usize = 10;
/// Number of leading columns scanned for a period caption.
pub const PERIOD_SCAN_COLUMNS: usize = 10;

static PERIOD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:(?:\bс|\bfrom)\s*)?(\d{1,2})[./](\d{1,2})(?:[./](\d{2,4}))?\s*(?:г\.?\s*)?(?:-|–|—|по|to)\s*(\d{1,2})[./](\d{1,2})[./](\d{2,4})",
    )
    .expect("period pattern is a valid regex")
});

fn number<T: std::str::FromStr>(captures: &Captures<'_>, group: usize) -> Option<T> {
    captures.get(group)?.as_str().parse().ok()
}

fn full_year(year: i32) -> i32 {
    if year < 100 { 2000 + year } else { year }
}

/// Parses a date range out of free text.
///
/// The end date must carry a year; a start date without one borrows it.
/// Two-digit years are read as 20YY. Impossible dates and ranges that end
/// before they start yield `None`.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::parse_period;
///
/// let period = parse_period("Отчет с 01.03 по 15.03.2025").unwrap();
/// assert_eq!(period.label(), "01.03-15.03.2025");
/// assert!(parse_period("Итого за месяц").is_none());
/// ```
pub fn parse_period(text: &str) -> Option<Period> {
    let captures = PERIOD_PATTERN.captures(text)?;

    let end_year = full_year(number(&captures, 6)?);
    let start_year = match captures.get(3) {
        Some(_) => full_year(number(&captures, 3)?),
        None => end_year,
    };

    let start = NaiveDate::from_ymd_opt(start_year, number(&captures, 2)?, number(&captures, 1)?)?;
    let end = NaiveDate::from_ymd_opt(end_year, number(&captures, 5)?, number(&captures, 4)?)?;
    if end < start {
        return None;
    }
    Some(Period::Range { start, end })
}

/// Scans the top-left block of a sheet for the first parsable date range.
///
/// Cells are visited row by row. Returns [`Period::NotFound`] when nothing
/// matches.
pub fn extract_period(sheet: &Sheet) -> Period {
    for row in 0..sheet.row_count().min(PERIOD_SCAN_ROWS) {
        for col in 0..PERIOD_SCAN_COLUMNS {
            let Some(text) = sheet.cell(row, col).as_text() else {
                continue;
            };
            if let Some(period) = parse_period(&text) {
                debug!(sheet = %sheet.name, row, col, period = %period, "Found period caption");
                return period;
            }
        }
    }
    Period::NotFound
}
