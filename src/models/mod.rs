//! Core data models for the Commission Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod file_result;
mod line_item;
mod payout;
mod period;
mod rule;
mod sheet;

pub use file_result::{AuditStep, AuditTrace, AuditWarning, LinePayout, ProcessedFile};
pub use line_item::{GROSS_PRICE_COLUMN, LineItem, PROCEDURE_COLUMN, QUANTITY_COLUMN};
pub use payout::{Payout, PayoutCategory, RateOutcome, ResolutionStrategy};
pub use period::{PERIOD_NOT_FOUND_LABEL, Period};
pub use rule::{RateValue, RawRuleRow, RuleRow, RuleTable};
pub use sheet::{Cell, Sheet, column_index, column_name};
