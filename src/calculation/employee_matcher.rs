//! Employee matching between transaction file names and the rulebook.
//!
//! A transaction file is named after its employee (`"ИВАНОВА март.xlsx"`);
//! the first token of the file stem is compared with the first token of every
//! rulebook employee name.

use std::path::Path;

use tracing::debug;

use crate::models::RuleTable;

use super::similarity::{is_similar, similarity};

/// Derives the employee identifier from a transaction file path.
///
/// Returns the first whitespace-delimited token of the file stem, uppercased,
/// or `None` when the stem is blank.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::employee_identifier;
/// use std::path::Path;
///
/// let id = employee_identifier(Path::new("files/Иванова 01-15 марта.xlsx"));
/// assert_eq!(id.as_deref(), Some("ИВАНОВА"));
/// ```
pub fn employee_identifier(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.split_whitespace().next())
        .map(str::to_uppercase)
}

/// Formats an identifier as a summary label: first letter upper, rest lower.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::display_name;
///
/// assert_eq!(display_name("ИВАНОВА"), "Иванова");
/// ```
pub fn display_name(identifier: &str) -> String {
    let mut chars = identifier.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Returns the uppercased first whitespace token of a rulebook employee name.
pub fn name_token(name: &str) -> String {
    name.split_whitespace()
        .next()
        .map(str::to_uppercase)
        .unwrap_or_default()
}

/// Narrows the rule table to the rows of one employee.
///
/// A row matches when the first token of its employee name scores strictly
/// above `threshold` against `identifier`. The result is empty, never an
/// error, when nothing matches; callers treat that as "employee not found".
///
/// # Example
///
/// ```
/// use commission_engine::calculation::match_employee;
/// use commission_engine::models::{RateValue, RuleRow, RuleTable};
///
/// let rule = |employee: &str| RuleRow {
///     rule: "Мастер".to_string(),
///     employee: employee.to_string(),
///     specialization: "МАССАЖ лица".to_string(),
///     rate_value: RateValue::Text("300 руб".to_string()),
/// };
/// let table = RuleTable::new(vec![rule("Иванова Анна"), rule("Петрова Мария")]);
///
/// let matched = match_employee("ИВАНОВА", &table, 0.8);
/// assert_eq!(matched.len(), 1);
/// assert!(match_employee("СИДОРОВА", &table, 0.8).is_empty());
/// ```
pub fn match_employee(identifier: &str, table: &RuleTable, threshold: f64) -> RuleTable {
    let identifier = identifier.to_uppercase();
    let matched = table.narrow(|row| is_similar(&identifier, &name_token(&row.employee), threshold));
    debug!(
        employee = %identifier,
        matched_rows = matched.len(),
        threshold,
        "Matched employee against rulebook"
    );
    matched
}

/// Returns the best similarity between `identifier` and any rulebook employee.
///
/// Used for diagnostics when [`match_employee`] comes back empty.
pub fn best_employee_score(identifier: &str, table: &RuleTable) -> Option<(String, f64)> {
    let identifier = identifier.to_uppercase();
    table
        .rows()
        .iter()
        .map(|row| (row.employee.clone(), similarity(&identifier, &name_token(&row.employee))))
        .fold(None, |best: Option<(String, f64)>, candidate| match best {
            Some(current) if current.1 >= candidate.1 => Some(current),
            _ => Some(candidate),
        })
}
