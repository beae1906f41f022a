//! Pay period model.
//!
//! A [`Period`] is the calendar range covered by one transaction file. It is
//! the column key of the summary pivot.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when no date range could be found in a transaction file.
pub const PERIOD_NOT_FOUND_LABEL: &str = "Период не найден";

/// The date range of a transaction file.
///
/// Ranges order chronologically by start date, then end date. The
/// [`Period::NotFound`] sentinel orders after every range.
///
/// # Example
///
/// ```
/// use commission_engine::models::Period;
/// use chrono::NaiveDate;
///
/// let period = Period::Range {
///     start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
///     end: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
/// };
/// assert_eq!(period.label(), "01.03-15.03.2025");
/// assert!(period < Period::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// A resolved date range (inclusive).
    Range {
        /// First day of the period.
        start: NaiveDate,
        /// Last day of the period.
        end: NaiveDate,
    },
    /// No date range could be extracted.
    NotFound,
}

impl Period {
    /// Returns the normalized `DD.MM-DD.MM.YYYY` label.
    pub fn label(&self) -> String {
        match self {
            Period::Range { start, end } => format!(
                "{:02}.{:02}-{:02}.{:02}.{}",
                start.day(),
                start.month(),
                end.day(),
                end.month(),
                end.year()
            ),
            Period::NotFound => PERIOD_NOT_FOUND_LABEL.to_string(),
        }
    }

    /// Returns `true` for the sentinel period.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Period::NotFound)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
