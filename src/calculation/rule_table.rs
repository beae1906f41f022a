//! Rulebook expansion.
//!
//! This module turns the compact commission rulebook, where one row may name
//! several employees and several specializations, into a [`RuleTable`] with
//! exactly one employee and one specialization per row.

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{Cell, RateValue, RawRuleRow, RuleRow, RuleTable, Sheet};

/// Name of the rulebook sheet.
pub const RULEBOOK_SHEET: &str = "расчет ЗП";
/// Zero-based index of the rulebook header row.
pub const RULEBOOK_HEADER_ROW: usize = 1;
/// Header of the rule label column.
pub const RULE_HEADER: &str = "Правило";
/// Header of the employee column.
pub const EMPLOYEE_HEADER: &str = "Сотрудник";
/// Header of the specialization column.
pub const SPECIALIZATION_HEADER: &str = "Специализация";
/// Header of the rate column.
pub const RATE_HEADER: &str = "Процент в ЗП";

/// Separators between employee names inside one rulebook cell, applied in order.
const EMPLOYEE_SEPARATORS: [&str; 3] = ["\n", ",", "  "];

/// Reads raw rulebook rows from a sheet whose header sits at `header_row`.
///
/// Columns are located by header name; rows above the header and rows that
/// are blank in all four columns are ignored.
///
/// # Errors
///
/// Returns [`EngineError::MissingColumn`] when one of the four headers is absent.
pub fn rows_from_sheet(sheet: &Sheet, header_row: usize) -> EngineResult<Vec<RawRuleRow>> {
    let find_column = |header: &str| -> EngineResult<usize> {
        sheet
            .rows
            .get(header_row)
            .and_then(|cells| {
                cells
                    .iter()
                    .position(|cell| cell.as_text().as_deref() == Some(header))
            })
            .ok_or_else(|| EngineError::MissingColumn {
                sheet: sheet.name.clone(),
                column: header.to_string(),
            })
    };

    let rule_col = find_column(RULE_HEADER)?;
    let employee_col = find_column(EMPLOYEE_HEADER)?;
    let specialization_col = find_column(SPECIALIZATION_HEADER)?;
    let rate_col = find_column(RATE_HEADER)?;

    let rows = (header_row + 1..sheet.row_count())
        .filter(|&row| {
            [rule_col, employee_col, specialization_col, rate_col]
                .iter()
                .any(|&col| !sheet.cell(row, col).is_blank())
        })
        .map(|row| RawRuleRow {
            rule: sheet.cell(row, rule_col).as_text(),
            employee: sheet.cell(row, employee_col).as_text(),
            specialization: sheet.cell(row, specialization_col).clone(),
            rate_value: RateValue::from_cell(sheet.cell(row, rate_col)),
        })
        .collect();

    Ok(rows)
}

/// Fills blank `rule` and `employee` fields with the nearest preceding
/// non-blank value.
///
/// Leading rows with nothing to inherit stay blank.
pub fn forward_fill(rows: &mut [RawRuleRow]) {
    let mut last_rule: Option<String> = None;
    let mut last_employee: Option<String> = None;

    for row in rows.iter_mut() {
        match &row.rule {
            Some(rule) => last_rule = Some(rule.clone()),
            None => row.rule = last_rule.clone(),
        }
        match &row.employee {
            Some(employee) => last_employee = Some(employee.clone()),
            None => row.employee = last_employee.clone(),
        }
    }
}

/// Splits an employee cell into trimmed, non-empty names.
///
/// Names may be separated by newlines, commas or double spaces.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::split_employees;
///
/// assert_eq!(
///     split_employees("Иванова Анна\nПетрова Мария,  Сидорова"),
///     vec!["Иванова Анна", "Петрова Мария", "Сидорова"]
/// );
/// ```
pub fn split_employees(value: &str) -> Vec<String> {
    let mut parts = vec![value.to_string()];
    for separator in EMPLOYEE_SEPARATORS {
        parts = parts
            .iter()
            .flat_map(|part| part.split(separator).map(str::to_string))
            .collect();
    }
    parts
        .into_iter()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Splits a specialization cell into trimmed, non-empty labels.
///
/// Text splits on newlines; a numeric cell is a single label.
pub fn split_specializations(cell: &Cell) -> Vec<String> {
    match cell {
        Cell::Text(text) => text
            .split('\n')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        other => other.as_text().into_iter().collect(),
    }
}

/// Expands one forward-filled raw row into its (employee, specialization) pairs.
///
/// Emission order is employee order, then specialization order. Every emitted
/// row carries the raw row's rate value unchanged.
pub fn expand_row(row: &RawRuleRow) -> Vec<RuleRow> {
    let Some(employees) = row.employee.as_deref() else {
        return Vec::new();
    };
    let rule = row.rule.as_deref().unwrap_or_default();
    let specializations = split_specializations(&row.specialization);

    split_employees(employees)
        .into_iter()
        .flat_map(|employee| {
            specializations.iter().map(move |specialization| RuleRow {
                rule: rule.to_string(),
                employee: employee.clone(),
                specialization: specialization.clone(),
                rate_value: row.rate_value.clone(),
            })
        })
        .collect()
}

/// Builds the normalized [`RuleTable`] from raw rulebook rows.
///
/// Applies [`forward_fill`] and then [`expand_row`] to each row in source order.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::build_rule_table;
/// use commission_engine::models::{Cell, RateValue, RawRuleRow};
/// use rust_decimal::Decimal;
///
/// let rows = vec![RawRuleRow {
///     rule: Some("Мастер".to_string()),
///     employee: Some("A\nB".to_string()),
///     specialization: Cell::Text("X\nY".to_string()),
///     rate_value: RateValue::Number(Decimal::new(4, 1)),
/// }];
///
/// let table = build_rule_table(rows);
/// let pairs: Vec<(&str, &str)> = table
///     .rows()
///     .iter()
///     .map(|r| (r.employee.as_str(), r.specialization.as_str()))
///     .collect();
/// assert_eq!(pairs, vec![("A", "X"), ("A", "Y"), ("B", "X"), ("B", "Y")]);
/// ```
pub fn build_rule_table(mut rows: Vec<RawRuleRow>) -> RuleTable {
    forward_fill(&mut rows);
    let expanded: Vec<RuleRow> = rows.iter().flat_map(expand_row).collect();
    debug!(
        raw_rows = rows.len(),
        rule_rows = expanded.len(),
        "Expanded rulebook"
    );
    RuleTable::new(expanded)
}

/// Reads and expands the rulebook sheet in one step.
pub fn rule_table_from_sheet(sheet: &Sheet) -> EngineResult<RuleTable> {
    let rows = rows_from_sheet(sheet, RULEBOOK_HEADER_ROW)?;
    Ok(build_rule_table(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn raw(rule: Option<&str>, employee: Option<&str>, specialization: &str, rate: RateValue) -> RawRuleRow {
        RawRuleRow {
            rule: rule.map(str::to_string),
            employee: employee.map(str::to_string),
            specialization: if specialization.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(specialization.to_string())
            },
            rate_value: rate,
        }
    }

    /// RT-001: cartesian expansion of two employees and two specializations
    #[test]
    fn test_two_by_two_expansion() {
        let rate = RateValue::Number(dec("0.4"));
        let table = build_rule_table(vec![raw(Some("R"), Some("A\nB"), "X\nY", rate.clone())]);

        assert_eq!(table.len(), 4);
        let pairs: Vec<(String, String)> = table
            .rows()
            .iter()
            .map(|r| (r.employee.clone(), r.specialization.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), "X".to_string()),
                ("A".to_string(), "Y".to_string()),
                ("B".to_string(), "X".to_string()),
                ("B".to_string(), "Y".to_string()),
            ]
        );
        assert!(table.rows().iter().all(|r| r.rate_value == rate));
    }

    /// RT-002: blank rule and employee inherit from the row above
    #[test]
    fn test_forward_fill_inherits_rule_and_employee() {
        let table = build_rule_table(vec![
            raw(Some("Мастер"), Some("Иванова"), "СТРИЖКИ", RateValue::Number(dec("0.5"))),
            raw(None, None, "МАССАЖ лица", RateValue::Number(dec("0.3"))),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].employee, "Иванова");
        assert_eq!(table.rows()[1].rule, "Мастер");
        assert_eq!(table.rows()[1].rate_value, RateValue::Number(dec("0.3")));
    }

    /// RT-003: leading row without employee is dropped
    #[test]
    fn test_leading_row_without_employee_dropped() {
        let table = build_rule_table(vec![
            raw(None, None, "СТРИЖКИ", RateValue::Number(dec("0.5"))),
            raw(Some("R"), Some("Иванова"), "МАССАЖ", RateValue::Number(dec("0.3"))),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].specialization, "МАССАЖ");
    }

    /// RT-004: empty tokens are dropped
    #[test]
    fn test_empty_tokens_dropped() {
        let table = build_rule_table(vec![raw(
            Some("R"),
            Some("A\n\n , B"),
            "X\n \nY\n",
            RateValue::Text("300 руб".to_string()),
        )]);
        assert_eq!(table.len(), 4);
    }

    /// RT-005: blank specialization yields no rows
    #[test]
    fn test_blank_specialization_yields_nothing() {
        let table = build_rule_table(vec![raw(Some("R"), Some("A"), "", RateValue::Number(dec("1")))]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_numeric_specialization_is_single_label() {
        assert_eq!(split_specializations(&Cell::Number(dec("15"))), vec!["15"]);
        assert!(split_specializations(&Cell::Empty).is_empty());
    }

    #[test]
    fn test_split_employees_on_double_space_not_single() {
        assert_eq!(
            split_employees("Иванова Анна  Петрова Мария"),
            vec!["Иванова Анна", "Петрова Мария"]
        );
    }

    #[test]
    fn test_rows_from_sheet_locates_headers_on_second_row() {
        let mut sheet = Sheet::from_text_rows(
            RULEBOOK_SHEET,
            &[
                &["Расчет заработной платы", "", "", ""],
                &["Правило", "Сотрудник", "Специализация", "Процент в ЗП"],
                &["Мастер", "Иванова", "СТРИЖКИ", ""],
                &["", "", "", ""],
                &["", "", "МАССАЖ лица", "300 руб"],
            ],
        );
        sheet.set(2, 3, Cell::Number(dec("0.5")));

        let rows = rows_from_sheet(&sheet, RULEBOOK_HEADER_ROW).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rate_value, RateValue::Number(dec("0.5")));
        assert_eq!(rows[1].employee, None);
        assert_eq!(rows[1].rate_value, RateValue::Text("300 руб".to_string()));

        let table = rule_table_from_sheet(&sheet).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].employee, "Иванова");
    }

    #[test]
    fn test_rows_from_sheet_missing_column() {
        let sheet = Sheet::from_text_rows(
            RULEBOOK_SHEET,
            &[&[""], &["Правило", "Сотрудник", "Специализация"]],
        );
        match rows_from_sheet(&sheet, RULEBOOK_HEADER_ROW) {
            Err(EngineError::MissingColumn { column, .. }) => assert_eq!(column, RATE_HEADER),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn prop_expansion_is_cartesian(
            employees in prop::collection::vec("[А-Я]{1,6}", 1..4),
            specs in prop::collection::vec("[А-Я]{1,6}", 1..4),
        ) {
            let row = raw(
                Some("R"),
                Some(&employees.join("\n")),
                &specs.join("\n"),
                RateValue::Number(dec("0.5")),
            );
            let table = build_rule_table(vec![row]);
            prop_assert_eq!(table.len(), employees.len() * specs.len());
        }
    }
}
