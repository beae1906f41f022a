//! Summary pivot of employee totals per period.
//!
//! The pivot is kept rectangular while it is built: recording a new employee
//! fills every known period with zero, and recording a new period adds a zero
//! cell to every known employee.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Cell, Period, Sheet, column_name};

/// Name of the summary worksheet.
pub const SUMMARY_SHEET: &str = "Сводная";
/// Header of the employee label column.
pub const SUMMARY_EMPLOYEE_HEADER: &str = "Сотрудник";
/// Label of the column totals row.
pub const SUMMARY_TOTAL_LABEL: &str = "ИТОГО";

/// Accumulates file totals into an employee by period pivot.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::SummaryTable;
/// use commission_engine::models::Period;
/// use rust_decimal::Decimal;
///
/// let mut table = SummaryTable::new();
/// table.record("Иванова", Period::NotFound, Decimal::from(1200));
/// let report = table.finalize();
/// assert_eq!(report.rows[0].values, vec![Decimal::from(1200)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SummaryTable {
    periods: BTreeSet<Period>,
    rows: IndexMap<String, BTreeMap<Period, Decimal>>,
}

impl SummaryTable {
    /// Creates an empty pivot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Records a file total for `employee` in `period`.
    ///
    /// A second total for the same pair replaces the first.
    pub fn record(&mut self, employee: &str, period: Period, total: Decimal) {
        if self.periods.insert(period.clone()) {
            for values in self.rows.values_mut() {
                values.entry(period.clone()).or_insert(Decimal::ZERO);
            }
        }

        let periods = &self.periods;
        let values = self.rows.entry(employee.to_string()).or_insert_with(|| {
            periods
                .iter()
                .map(|known| (known.clone(), Decimal::ZERO))
                .collect()
        });
        if let Some(previous) = values.insert(period.clone(), total) {
            if !previous.is_zero() {
                debug!(employee, period = %period, %previous, %total, "Replaced summary total");
            }
        }
    }

    /// Produces the final report with rows sorted by employee label.
    pub fn finalize(&self) -> SummaryReport {
        let periods: Vec<Period> = self.periods.iter().cloned().collect();

        let mut rows: Vec<SummaryRow> = self
            .rows
            .iter()
            .map(|(employee, values)| SummaryRow {
                employee: employee.clone(),
                values: periods
                    .iter()
                    .map(|period| values.get(period).copied().unwrap_or(Decimal::ZERO))
                    .collect(),
            })
            .collect();
        rows.sort_by(|a, b| a.employee.cmp(&b.employee));

        let totals = (0..periods.len())
            .map(|col| rows.iter().map(|row| row.values[col]).sum())
            .collect();

        SummaryReport { periods, rows, totals }
    }
}

/// One employee row of the summary report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Capitalized employee label.
    pub employee: String,
    /// One value per period, aligned with [`SummaryReport::periods`].
    pub values: Vec<Decimal>,
}

/// The finalized summary pivot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryReport {
    /// Period columns in chronological order, sentinel last.
    pub periods: Vec<Period>,
    /// Employee rows sorted by label.
    pub rows: Vec<SummaryRow>,
    /// Column totals, aligned with `periods`.
    pub totals: Vec<Decimal>,
}

impl SummaryReport {
    /// Looks up the value for an employee and period.
    pub fn value(&self, employee: &str, period: &Period) -> Option<Decimal> {
        let col = self.periods.iter().position(|p| p == period)?;
        let row = self.rows.iter().find(|row| row.employee == employee)?;
        row.values.get(col).copied()
    }

    /// Renders the report as a worksheet.
    ///
    /// Row 0 holds the headers, then one row per employee, then an
    /// [`SUMMARY_TOTAL_LABEL`] row whose cells are `SUM` formulas over the
    /// employee rows.
    pub fn to_sheet(&self) -> Sheet {
        let mut sheet = Sheet::new(SUMMARY_SHEET);
        sheet.set(0, 0, Cell::Text(SUMMARY_EMPLOYEE_HEADER.to_string()));
        for (col, period) in self.periods.iter().enumerate() {
            sheet.set(0, col + 1, Cell::Text(period.label()));
        }

        for (offset, row) in self.rows.iter().enumerate() {
            sheet.set(offset + 1, 0, Cell::Text(row.employee.clone()));
            for (col, value) in row.values.iter().enumerate() {
                sheet.set(offset + 1, col + 1, Cell::Number(*value));
            }
        }

        let total_row = self.rows.len() + 1;
        sheet.set(total_row, 0, Cell::Text(SUMMARY_TOTAL_LABEL.to_string()));
        for col in 1..=self.periods.len() {
            let letter = column_name(col);
            let cell = if self.rows.is_empty() {
                Cell::Number(Decimal::ZERO)
            } else {
                Cell::Formula(format!("=SUM({letter}2:{letter}{total_row})"))
            };
            sheet.set(total_row, col, cell);
        }
        sheet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn period(month: u32) -> Period {
        Period::Range {
            start: NaiveDate::from_ymd_opt(2025, month, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, month, 15).unwrap(),
        }
    }

    /// SU-001: every employee gets a cell for every period
    #[test]
    fn test_pivot_is_rectangular() {
        let mut table = SummaryTable::new();
        table.record("Иванова", period(3), dec("1000"));
        table.record("Петрова", period(4), dec("500"));

        let report = table.finalize();
        assert_eq!(report.periods, vec![period(3), period(4)]);
        assert_eq!(report.value("Иванова", &period(3)), Some(dec("1000")));
        assert_eq!(report.value("Иванова", &period(4)), Some(dec("0")));
        assert_eq!(report.value("Петрова", &period(3)), Some(dec("0")));
        assert_eq!(report.value("Петрова", &period(4)), Some(dec("500")));
    }

    /// SU-002: same employee and period replaces, not adds
    #[test]
    fn test_record_overwrites() {
        let mut table = SummaryTable::new();
        table.record("Иванова", period(3), dec("1000"));
        table.record("Иванова", period(3), dec("700"));
        assert_eq!(table.finalize().value("Иванова", &period(3)), Some(dec("700")));
    }

    #[test]
    fn test_rows_sorted_and_sentinel_last() {
        let mut table = SummaryTable::new();
        table.record("Петрова", Period::NotFound, dec("1"));
        table.record("Иванова", period(5), dec("2"));
        table.record("Алексеева", period(2), dec("3"));

        let report = table.finalize();
        let names: Vec<&str> = report.rows.iter().map(|r| r.employee.as_str()).collect();
        assert_eq!(names, vec!["Алексеева", "Иванова", "Петрова"]);
        assert_eq!(report.periods.last(), Some(&Period::NotFound));
        assert_eq!(report.totals, vec![dec("3"), dec("2"), dec("1")]);
    }

    #[test]
    fn test_to_sheet_layout() {
        let mut table = SummaryTable::new();
        table.record("Иванова", period(3), dec("1000"));
        table.record("Петрова", period(3), dec("500"));

        let sheet = table.finalize().to_sheet();
        assert_eq!(sheet.cell(0, 0), &Cell::Text("Сотрудник".to_string()));
        assert_eq!(sheet.cell(0, 1), &Cell::Text("01.03-15.03.2025".to_string()));
        assert_eq!(sheet.cell(1, 0), &Cell::Text("Иванова".to_string()));
        assert_eq!(sheet.cell(2, 1), &Cell::Number(dec("500")));
        assert_eq!(sheet.cell(3, 0), &Cell::Text("ИТОГО".to_string()));
        assert_eq!(sheet.cell(3, 1), &Cell::Formula("=SUM(B2:B3)".to_string()));
    }

    #[test]
    fn test_empty_summary_sheet_has_header_and_total() {
        let sheet = SummaryTable::new().finalize().to_sheet();
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.cell(1, 0), &Cell::Text("ИТОГО".to_string()));
    }

    proptest! {
        #[test]
        fn prop_every_row_spans_every_period(
            entries in proptest::collection::vec((0usize..4, 1u32..13, 0i64..10_000), 1..20)
        ) {
            let names = ["А", "Б", "В", "Г"];
            let mut table = SummaryTable::new();
            for (who, month, amount) in &entries {
                table.record(names[*who], period(*month), Decimal::from(*amount));
            }
            let report = table.finalize();
            for row in &report.rows {
                prop_assert_eq!(row.values.len(), report.periods.len());
            }
            prop_assert_eq!(report.totals.len(), report.periods.len());
        }
    }
}
