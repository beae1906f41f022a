//! Commission Engine for salon payroll spreadsheets
//!
//! This crate expands a commission rulebook into normalized rules, resolves a
//! payout for every line item of per-employee transaction spreadsheets, and
//! aggregates the file totals into an employee by pay-period summary.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod processing;
