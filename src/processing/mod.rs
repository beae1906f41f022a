//! File processing for the Commission Engine.
//!
//! This module drives the calculation layer over real workbooks: it reads the
//! rulebook and the transaction files through a [`WorkbookStore`], edits the
//! copied files, writes the summary and reports progress.

mod batch;
mod file_processor;
mod progress;
mod workbook;

pub use batch::{BatchReport, BatchRunner, SUMMARY_FILE_NAME, SkipReason, SkippedFile, write_report};
pub use file_processor::{
    FileProcessor, FileStage, PAYOUT_HEADER, REMOVED_COLUMNS, WorkbookFormat, payout_edit,
};
pub use progress::{NoProgress, ProgressReporter, STEPS_PER_FILE, total_steps};
pub use workbook::{
    FileWorkbookStore, MemoryWorkbookStore, SheetEdit, WorkbookStore, cell_from_data,
    sheet_from_range,
};
