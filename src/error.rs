//! Error types for the Commission Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while building rules, processing
//! transaction files and persisting results.

use thiserror::Error;

/// The main error type for the Commission Engine.
///
/// Only batch setup failures (configuration, rulebook, input folder, summary
/// output) abort a run. Per-file variants such as [`EngineError::UnsupportedFormat`]
/// and [`EngineError::EmployeeNotFound`] are caught by the batch runner, logged
/// and recorded as skipped files.
///
/// # Example
///
/// ```
/// use commission_engine::error::EngineError;
///
/// let error = EngineError::EmployeeNotFound {
///     employee: "ПЕТРОВА".to_string(),
/// };
/// assert_eq!(error.to_string(), "Employee 'ПЕТРОВА' not found in the rulebook");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Configuration file could not be written.
    #[error("Failed to write configuration file '{path}': {message}")]
    ConfigWriteError {
        /// The path to the file that failed to save.
        path: String,
        /// A description of the write error.
        message: String,
    },

    /// A configuration option name or value was rejected.
    #[error("Invalid setting '{key}': {message}")]
    InvalidSetting {
        /// The option name.
        key: String,
        /// Why the option was rejected.
        message: String,
    },

    /// A workbook could not be opened, read or saved.
    #[error("Workbook error in '{path}': {message}")]
    WorkbookError {
        /// The workbook path.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// A named sheet does not exist in the workbook.
    #[error("Sheet '{sheet}' not found in '{path}'")]
    SheetNotFound {
        /// The workbook path.
        path: String,
        /// The missing sheet name.
        sheet: String,
    },

    /// A required header is absent from the rulebook sheet.
    #[error("Column '{column}' not found in sheet '{sheet}'")]
    MissingColumn {
        /// The sheet that was searched.
        sheet: String,
        /// The missing column header.
        column: String,
    },

    /// A transaction file has an extension the engine cannot read.
    #[error("File '{path}' has unsupported format")]
    UnsupportedFormat {
        /// The rejected file.
        path: String,
    },

    /// No rulebook row matched the employee derived from a file name.
    #[error("Employee '{employee}' not found in the rulebook")]
    EmployeeNotFound {
        /// The employee identifier derived from the file name.
        employee: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error on '{path}': {message}")]
    Io {
        /// The path involved.
        path: String,
        /// The underlying error message.
        message: String,
    },
}

impl EngineError {
    /// Builds an [`EngineError::Io`] from a path and an I/O error.
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        EngineError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Builds an [`EngineError::WorkbookError`] from a path and any displayable error.
    pub fn workbook(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        EngineError::WorkbookError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
