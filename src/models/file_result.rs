//! File result models for the Commission Engine.
//!
//! This module contains the [`ProcessedFile`] type and its associated
//! structures that capture every output of processing one transaction file:
//! per-row payouts, the file total, the extracted period and an audit trace.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{Payout, Period, ResolutionStrategy};

/// The payout computed for one transaction row.
///
/// # Example
///
/// ```
/// use commission_engine::models::{LinePayout, Payout, ResolutionStrategy};
/// use rust_decimal::Decimal;
///
/// let line = LinePayout {
///     row_index: 1,
///     procedure_name: Some("СТРИЖКИ".to_string()),
///     payout: Payout::Amount(Decimal::from(500)),
///     strategy: ResolutionStrategy::Category,
///     matched_key: None,
/// };
/// assert_eq!(line.payout.amount(), Some(Decimal::from(500)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePayout {
    /// Zero-based sheet row of the line item.
    pub row_index: usize,
    /// The procedure name as read from the row.
    pub procedure_name: Option<String>,
    /// The computed payout.
    pub payout: Payout,
    /// The strategy that resolved the rate.
    pub strategy: ResolutionStrategy,
    /// The rulebook specialization used, when one was.
    pub matched_key: Option<String>,
}

/// A single step in the audit trace recording a payout decision.
///
/// Each step captures the input, output, and reasoning for one line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The identifier of the resolution strategy that applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated while processing a file.
///
/// Warnings indicate rows that could not be paid but do not stop the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The complete audit trace for one file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of payout steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated while processing.
    pub warnings: Vec<AuditWarning>,
    /// The processing duration in microseconds.
    pub duration_us: u64,
}

/// The complete result of processing one transaction file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFile {
    /// The source transaction file.
    pub source: PathBuf,
    /// The augmented copy written to the output folder.
    pub output: PathBuf,
    /// The employee identifier derived from the file name (uppercased).
    pub identifier: String,
    /// The capitalized employee label used in the summary.
    pub employee: String,
    /// The period extracted from the source file.
    pub period: Period,
    /// One payout per transaction row, in sheet order.
    pub lines: Vec<LinePayout>,
    /// Sum of all non-blank payouts.
    pub total: Decimal,
    /// Audit trace of the payout decisions.
    pub audit_trace: AuditTrace,
}

impl ProcessedFile {
    /// Sums the non-blank payouts of `lines`.
    pub fn total_of(lines: &[LinePayout]) -> Decimal {
        lines.iter().filter_map(|line| line.payout.amount()).sum()
    }

    /// Number of payable rows for which no rate was found.
    pub fn unresolved_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.strategy == ResolutionStrategy::Unresolved)
            .count()
    }
}
