//! Processing of one per-employee transaction file.
//!
//! A file goes through four stages: it is copied into the output folder,
//! converted to `.xlsx` when it is a legacy workbook, every line item gets a
//! payout, and the payout column is added to the copy in place.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calculation::{
    RateContext, best_employee_score, calculate_line_payout, display_name, employee_identifier,
    extract_period, match_employee,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditTrace, AuditWarning, Cell, LineItem, LinePayout, ProcessedFile, ResolutionStrategy,
    RuleTable, Sheet, column_index, column_name,
};

use super::workbook::{SheetEdit, WorkbookStore};

/// Header written above the payout column.
pub const PAYOUT_HEADER: &str = "ЗП";

/// Columns removed from the output sheet, highest first.
pub const REMOVED_COLUMNS: [&str; 3] = ["H", "G", "E"];

/// Accepted transaction workbook formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkbookFormat {
    /// Office Open XML workbook.
    Xlsx,
    /// Legacy binary workbook, converted before processing.
    Xls,
}

impl WorkbookFormat {
    /// Detects the format from the file extension, case-insensitively.
    ///
    /// # Example
    ///
    /// ```
    /// use commission_engine::processing::WorkbookFormat;
    /// use std::path::Path;
    ///
    /// assert_eq!(WorkbookFormat::from_path(Path::new("a.XLS")), Some(WorkbookFormat::Xls));
    /// assert_eq!(WorkbookFormat::from_path(Path::new("a.csv")), None);
    /// ```
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(WorkbookFormat::Xlsx),
            "xls" => Some(WorkbookFormat::Xls),
            _ => None,
        }
    }
}

/// Observable stages of processing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileStage {
    /// The source was copied into the output folder.
    Copied,
    /// Legacy conversion is done, or was not needed.
    Converted,
    /// Every line item has a payout.
    Calculated,
    /// The augmented sheet was saved.
    Persisted,
}

impl FileStage {
    /// One-based position of the stage within the file.
    pub fn number(self) -> usize {
        match self {
            FileStage::Copied => 1,
            FileStage::Converted => 2,
            FileStage::Calculated => 3,
            FileStage::Persisted => 4,
        }
    }
}

/// Builds the edit that appends the payout column, drops columns H, G and E
/// where they exist and writes a `SUM` formula beneath the payout column.
///
/// `sheet` is the unmodified transaction sheet; row 0 is its header row.
/// Blank payouts stay empty cells. The formula is only written when the sheet
/// has data rows.
pub fn payout_edit(sheet: &Sheet, lines: &[LinePayout]) -> SheetEdit {
    let width = sheet.width();
    let mut edit = SheetEdit::default();

    edit.cells.push((0, width, Cell::Text(PAYOUT_HEADER.to_string())));
    for line in lines {
        if let Some(amount) = line.payout.amount() {
            edit.cells.push((line.row_index, width, Cell::Number(amount)));
        }
    }

    let mut payout_col = width;
    for col in REMOVED_COLUMNS.iter().filter_map(|name| column_index(name)) {
        if col < width {
            edit.removed_columns.push(col);
            payout_col -= 1;
        }
    }

    let data_rows = sheet.row_count();
    if data_rows > 1 {
        let letter = column_name(payout_col);
        edit.trailing_cells.push((
            data_rows,
            payout_col,
            Cell::Formula(format!("=SUM({letter}2:{letter}{data_rows})")),
        ));
    }
    edit
}

/// Processes transaction files against a rule table.
///
/// # Example
///
/// ```
/// use commission_engine::models::{Cell, RateValue, RuleRow, RuleTable, Sheet};
/// use commission_engine::processing::{FileProcessor, MemoryWorkbookStore};
/// use rust_decimal::Decimal;
/// use std::path::Path;
///
/// let rules = RuleTable::new(vec![RuleRow {
///     rule: "Мастер".to_string(),
///     employee: "Иванова Анна".to_string(),
///     specialization: "ПИЛИНГ".to_string(),
///     rate_value: RateValue::Number(Decimal::from(150)),
/// }]);
///
/// let store = MemoryWorkbookStore::new();
/// let mut sheet = Sheet::from_text_rows("Лист1", &[&["Наименование", "Кол-во"], &["ПИЛИНГ"]]);
/// sheet.set(1, 1, Cell::Number(Decimal::from(3)));
/// store.insert("in/Иванова.xlsx", sheet);
///
/// let processor = FileProcessor::new(&store, &rules, Path::new("out"), 0.8);
/// let processed = processor.process_file(Path::new("in/Иванова.xlsx"), |_| {})?;
/// assert_eq!(processed.total, Decimal::from(450));
/// # Ok::<(), commission_engine::error::EngineError>(())
/// ```
pub struct FileProcessor<'a, S: WorkbookStore> {
    store: &'a S,
    rules: &'a RuleTable,
    output_dir: &'a Path,
    threshold: f64,
}

impl<'a, S: WorkbookStore> FileProcessor<'a, S> {
    /// Creates a processor writing into `output_dir`.
    pub fn new(store: &'a S, rules: &'a RuleTable, output_dir: &'a Path, threshold: f64) -> Self {
        Self {
            store,
            rules,
            output_dir,
            threshold,
        }
    }

    /// Processes one file, calling `on_stage` after each completed stage.
    ///
    /// The format and the employee are checked before anything is copied, so
    /// a rejected file leaves no trace in the output folder.
    ///
    /// # Returns
    ///
    /// Returns the processed file, or an error if:
    /// - The extension is not `.xlsx` or `.xls` (`UnsupportedFormat`)
    /// - No rulebook employee matches the file name (`EmployeeNotFound`)
    /// - Copying, conversion, reading or writing fails
    pub fn process_file(
        &self,
        source: &Path,
        mut on_stage: impl FnMut(FileStage),
    ) -> EngineResult<ProcessedFile> {
        let start_time = Instant::now();

        let format = WorkbookFormat::from_path(source).ok_or_else(|| EngineError::UnsupportedFormat {
            path: source.display().to_string(),
        })?;

        let identifier = employee_identifier(source).unwrap_or_default();
        let matched = match_employee(&identifier, self.rules, self.threshold);
        if matched.is_empty() {
            if let Some((closest, score)) = best_employee_score(&identifier, self.rules) {
                debug!(employee = %identifier, closest = %closest, score, "Closest rulebook employee");
            }
            return Err(EngineError::EmployeeNotFound {
                employee: identifier,
            });
        }

        let file_name = source.file_name().ok_or_else(|| EngineError::UnsupportedFormat {
            path: source.display().to_string(),
        })?;
        let mut output: PathBuf = self.output_dir.join(file_name);
        self.store.copy_workbook(source, &output)?;
        on_stage(FileStage::Copied);

        if format == WorkbookFormat::Xls {
            output = self.store.convert_legacy(&output)?;
        }
        on_stage(FileStage::Converted);

        let sheet = self.store.read_sheet(&output, None)?;
        let context = RateContext::new(matched.rates(), self.threshold);

        let mut lines = Vec::with_capacity(sheet.row_count().saturating_sub(1));
        let mut audit_trace = AuditTrace::default();
        for (row_index, cells) in sheet.rows.iter().enumerate().skip(1) {
            let item = LineItem::from_cells(row_index, cells);
            let step_number = u32::try_from(row_index).unwrap_or(u32::MAX);
            let result = calculate_line_payout(&item, &context, step_number);

            if result.line.strategy == ResolutionStrategy::Unresolved {
                audit_trace.warnings.push(AuditWarning {
                    code: "UNRESOLVED_RATE".to_string(),
                    message: format!(
                        "Row {}: no rate for '{}'",
                        row_index + 1,
                        result.line.procedure_name.as_deref().unwrap_or_default()
                    ),
                    severity: "medium".to_string(),
                });
            }
            audit_trace.steps.push(result.audit_step);
            lines.push(result.line);
        }
        on_stage(FileStage::Calculated);

        let period = extract_period(&sheet);
        self.store.edit_sheet(&output, &payout_edit(&sheet, &lines))?;
        on_stage(FileStage::Persisted);

        let total = ProcessedFile::total_of(&lines);
        audit_trace.duration_us = start_time.elapsed().as_micros() as u64;

        if !audit_trace.warnings.is_empty() {
            warn!(
                file = %source.display(),
                unresolved = audit_trace.warnings.len(),
                "Some procedures had no rate"
            );
        }
        info!(
            file = %source.display(),
            employee = %identifier,
            period = %period,
            rows = lines.len(),
            total = %total,
            duration_us = audit_trace.duration_us,
            "Processed file"
        );

        Ok(ProcessedFile {
            source: source.to_path_buf(),
            output,
            employee: display_name(&identifier),
            identifier,
            period,
            lines,
            total,
            audit_trace,
        })
    }
}
