//! Batch runs over the input folder.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{RULEBOOK_SHEET, SummaryReport, SummaryTable, rule_table_from_sheet};
use crate::config::Settings;
use crate::error::{EngineError, EngineResult};
use crate::models::ProcessedFile;

use super::file_processor::FileProcessor;
use super::progress::{ProgressReporter, STEPS_PER_FILE, total_steps};
use super::workbook::WorkbookStore;

/// File name of the summary workbook in the output folder.
pub const SUMMARY_FILE_NAME: &str = "Сводная ЗП.xlsx";

/// Why a file was left out of the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The extension is neither `.xlsx` nor `.xls`.
    UnsupportedFormat,
    /// No rulebook employee matched the file name.
    EmployeeNotFound {
        /// Identifier derived from the file name.
        employee: String,
    },
    /// Reading, converting or writing the workbook failed.
    Failed {
        /// The underlying error.
        message: String,
    },
}

impl From<&EngineError> for SkipReason {
    fn from(error: &EngineError) -> Self {
        match error {
            EngineError::UnsupportedFormat { .. } => SkipReason::UnsupportedFormat,
            EngineError::EmployeeNotFound { employee } => SkipReason::EmployeeNotFound {
                employee: employee.clone(),
            },
            other => SkipReason::Failed {
                message: other.to_string(),
            },
        }
    }
}

/// A file that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// The input file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// The outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique identifier of the run, also attached to its log events.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Files that produced an output and a summary entry.
    pub processed: Vec<ProcessedFile>,
    /// Files that were skipped.
    pub skipped: Vec<SkippedFile>,
    /// The summary pivot as written.
    pub summary: SummaryReport,
    /// Path of the summary workbook.
    pub summary_path: PathBuf,
    /// `true` when the run stopped early on request.
    pub cancelled: bool,
}

/// Runs the engine over every file of the input folder.
///
/// Failures of a single file are logged and recorded; only setup failures
/// (rulebook, input folder, output folder, summary) end the run with an error.
///
/// # Example
///
/// ```
/// use commission_engine::config::Settings;
/// use commission_engine::models::Sheet;
/// use commission_engine::processing::{BatchRunner, MemoryWorkbookStore, NoProgress};
/// use std::path::Path;
///
/// let settings = Settings::with_base(Path::new("/salon"));
/// let store = MemoryWorkbookStore::new();
/// store.insert(
///     &settings.info_path,
///     Sheet::from_text_rows(
///         "расчет ЗП",
///         &[&[], &["Правило", "Сотрудник", "Специализация", "Процент в ЗП"]],
///     ),
/// );
///
/// let report = BatchRunner::new(&store, &settings).run(&mut NoProgress)?;
/// assert!(report.processed.is_empty());
/// assert!(store.contains("/salon/files_new/Сводная ЗП.xlsx"));
/// # Ok::<(), commission_engine::error::EngineError>(())
/// ```
pub struct BatchRunner<'a, S: WorkbookStore> {
    store: &'a S,
    settings: &'a Settings,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, S: WorkbookStore> BatchRunner<'a, S> {
    /// Creates a runner over `settings`.
    pub fn new(store: &'a S, settings: &'a Settings) -> Self {
        Self {
            store,
            settings,
            cancel: None,
        }
    }

    /// Stops the run before the next file once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Path of the summary workbook.
    pub fn summary_path(&self) -> PathBuf {
        self.settings.files_new_path.join(SUMMARY_FILE_NAME)
    }

    /// Runs the batch, reporting progress after every stage of every file and
    /// once more after the summary is written.
    pub fn run<P: ProgressReporter>(&self, progress: &mut P) -> EngineResult<BatchReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let settings = self.settings;

        info!(
            run_id = %run_id,
            rulebook = %settings.info_path.display(),
            input = %settings.files_path.display(),
            output = %settings.files_new_path.display(),
            "Starting batch run"
        );

        let rulebook = self.store.read_sheet(&settings.info_path, Some(RULEBOOK_SHEET))?;
        let rules = rule_table_from_sheet(&rulebook)?;
        let files = self.store.list_workbooks(&settings.files_path)?;
        self.store.ensure_dir(&settings.files_new_path)?;

        info!(run_id = %run_id, rules = rules.len(), files = files.len(), "Loaded rulebook");

        let processor = FileProcessor::new(
            self.store,
            &rules,
            &settings.files_new_path,
            settings.similarity_ratio,
        );
        let mut summary = SummaryTable::new();
        let mut processed = Vec::new();
        let mut skipped = Vec::new();
        let mut cancelled = false;

        for (index, file) in files.iter().enumerate() {
            if self.is_cancelled() {
                warn!(run_id = %run_id, remaining = files.len() - index, "Batch run cancelled");
                cancelled = true;
                break;
            }

            let base = index * STEPS_PER_FILE;
            let mut reached = base;
            let result = processor.process_file(file, |stage| {
                reached = base + stage.number();
                progress.step(reached);
            });

            match result {
                Ok(file_result) => {
                    summary.record(&file_result.employee, file_result.period.clone(), file_result.total);
                    processed.push(file_result);
                }
                Err(error) => {
                    warn!(run_id = %run_id, file = %file.display(), error = %error, "Skipping file");
                    skipped.push(SkippedFile {
                        path: file.clone(),
                        reason: SkipReason::from(&error),
                    });
                }
            }

            if reached < base + STEPS_PER_FILE {
                progress.step(base + STEPS_PER_FILE);
            }
        }

        let report = summary.finalize();
        let summary_path = self.summary_path();
        self.store.write_sheet(&summary_path, &report.to_sheet())?;
        progress.step(total_steps(files.len()));

        info!(
            run_id = %run_id,
            processed = processed.len(),
            skipped = skipped.len(),
            cancelled,
            summary = %summary_path.display(),
            "Batch run finished"
        );

        Ok(BatchReport {
            run_id,
            started_at,
            processed,
            skipped,
            summary: report,
            summary_path,
            cancelled,
        })
    }
}

/// Writes the batch report as pretty JSON.
pub fn write_report(path: &Path, report: &BatchReport) -> EngineResult<()> {
    let json = serde_json::to_string_pretty(report).map_err(|e| EngineError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| EngineError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, Sheet};
    use crate::processing::{MemoryWorkbookStore, NoProgress};
    use rust_decimal::Decimal;

    fn settings() -> Settings {
        Settings::with_base(Path::new("/salon"))
    }

    fn rulebook() -> Sheet {
        let mut sheet = Sheet::from_text_rows(
            RULEBOOK_SHEET,
            &[
                &["Ставки на март"],
                &["Правило", "Сотрудник", "Специализация", "Процент в ЗП"],
                &["Мастер", "Иванова Анна\nПетрова Мария", "ПИЛИНГ"],
            ],
        );
        sheet.set(2, 3, Cell::Number(Decimal::from(150)));
        sheet
    }

    fn transactions(qty: i64) -> Sheet {
        let mut sheet = Sheet::from_text_rows("Лист1", &[&["Наименование", "Кол-во"], &["ПИЛИНГ"]]);
        sheet.set(1, 1, Cell::Number(Decimal::from(qty)));
        sheet
    }

    fn store() -> MemoryWorkbookStore {
        let store = MemoryWorkbookStore::new();
        let settings = settings();
        store.insert(&settings.info_path, rulebook());
        store.insert(settings.files_path.join("Иванова.xlsx"), transactions(2));
        store.insert(settings.files_path.join("notes.txt"), transactions(1));
        store.insert(settings.files_path.join("Петрова.xls"), transactions(1));
        store
    }

    /// BR-001: progress is monotonic and ends at 4n + 1
    #[test]
    fn test_progress_steps() {
        let store = store();
        let settings = settings();
        let mut steps = Vec::new();
        let mut record = |n: usize| steps.push(n);

        let report = BatchRunner::new(&store, &settings).run(&mut record).unwrap();

        assert_eq!(report.processed.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        // notes.txt sorts first and is skipped without stages
        assert_eq!(steps, (4..=13).collect::<Vec<_>>());
    }

    /// BR-002: unsupported file is recorded, not fatal
    #[test]
    fn test_skipped_file_reason() {
        let store = store();
        let settings = settings();
        let report = BatchRunner::new(&store, &settings).run(&mut NoProgress).unwrap();

        assert_eq!(report.skipped[0].path, settings.files_path.join("notes.txt"));
        assert_eq!(report.skipped[0].reason, SkipReason::UnsupportedFormat);
        assert_eq!(report.summary.rows.len(), 2);
        assert!(store.contains(settings.files_new_path.join(SUMMARY_FILE_NAME)));
    }

    /// BR-003: a set flag stops before the first file
    #[test]
    fn test_cancel_before_first_file() {
        let store = store();
        let settings = settings();
        let flag = AtomicBool::new(true);
        let mut last = 0;
        let mut record = |n: usize| last = n;

        let report = BatchRunner::new(&store, &settings)
            .with_cancel_flag(&flag)
            .run(&mut record)
            .unwrap();

        assert!(report.cancelled);
        assert!(report.processed.is_empty());
        assert_eq!(last, 13);
        assert!(store.contains(settings.files_new_path.join(SUMMARY_FILE_NAME)));
    }

    #[test]
    fn test_missing_rulebook_is_fatal() {
        let store = MemoryWorkbookStore::new();
        let settings = settings();
        assert!(BatchRunner::new(&store, &settings).run(&mut NoProgress).is_err());
    }

    #[test]
    fn test_skip_reason_from_error() {
        let reason = SkipReason::from(&EngineError::EmployeeNotFound {
            employee: "СИДОРОВА".to_string(),
        });
        assert_eq!(
            reason,
            SkipReason::EmployeeNotFound {
                employee: "СИДОРОВА".to_string()
            }
        );
        let reason = SkipReason::from(&EngineError::Io {
            path: "a".to_string(),
            message: "denied".to_string(),
        });
        assert!(matches!(reason, SkipReason::Failed { .. }));
    }

    #[test]
    fn test_report_serializes() {
        let store = store();
        let settings = settings();
        let report = BatchRunner::new(&store, &settings).run(&mut NoProgress).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["skipped"][0]["reason"]["kind"], "unsupported_format");
        assert_eq!(json["processed"].as_array().unwrap().len(), 2);
    }
}
