//! Calculation logic for the Commission Engine.
//!
//! This module contains the pure calculation steps: rulebook expansion,
//! employee matching, rate resolution, payout calculation, period extraction
//! and the summary pivot. Nothing here touches the filesystem.

mod employee_matcher;
mod payout;
mod period;
mod rate_resolver;
mod rule_table;
mod similarity;
mod summary;

pub use employee_matcher::{
    best_employee_score, display_name, employee_identifier, match_employee, name_token,
};
pub use payout::{
    LinePayoutResult, MATERIALS_DEDUCTION, RETAIL_SHARE, SERVICE_SHARE, calculate_line_payout,
    calculate_payout, category_payout, extract_amount,
};
pub use period::{PERIOD_SCAN_COLUMNS, PERIOD_SCAN_ROWS, extract_period, parse_period};
pub use rate_resolver::{
    PER_UNIT_RATE_THRESHOLD, RESOLUTION_CHAIN, RateContext, Resolution, ResolverFn,
    SPECIALIZATION_ALIASES, alias_for, classify_rate, resolve_alias, resolve_category,
    resolve_exact, resolve_fuzzy, resolve_rate,
};
pub use rule_table::{
    EMPLOYEE_HEADER, RATE_HEADER, RULE_HEADER, RULEBOOK_HEADER_ROW, RULEBOOK_SHEET,
    SPECIALIZATION_HEADER, build_rule_table, expand_row, forward_fill, rows_from_sheet,
    rule_table_from_sheet, split_employees, split_specializations,
};
pub use similarity::{DEFAULT_SIMILARITY_THRESHOLD, is_similar, similarity};
pub use summary::{
    SUMMARY_EMPLOYEE_HEADER, SUMMARY_SHEET, SUMMARY_TOTAL_LABEL, SummaryReport, SummaryRow,
    SummaryTable,
};
