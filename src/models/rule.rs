//! Rulebook models.
//!
//! This module contains the raw rulebook row read from the commission sheet,
//! the normalized [`RuleRow`] produced by expansion, and the [`RuleTable`]
//! collection with its derived specialization to rate mapping.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Cell;

/// The commission value attached to a rule: a number or free text.
///
/// Numbers above 100 are per-unit amounts, numbers up to 100 are fractions of
/// the gross price. Text such as `"300 руб"` carries an embedded amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateValue {
    /// A numeric rate.
    Number(Decimal),
    /// A textual rate.
    Text(String),
}

impl RateValue {
    /// Converts a rulebook cell into a rate value.
    ///
    /// Empty cells and formulas become empty text, which resolves to a blank
    /// payout downstream.
    pub fn from_cell(cell: &Cell) -> Self {
        match cell {
            Cell::Number(value) => RateValue::Number(*value),
            Cell::Text(text) => RateValue::Text(text.trim().to_string()),
            Cell::Empty | Cell::Formula(_) => RateValue::Text(String::new()),
        }
    }
}

/// A rulebook row before expansion.
///
/// `rule` and `employee` may be `None` for rows that continue a merged block
/// above them; they are forward-filled before expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRuleRow {
    /// The rule label (`Правило`).
    pub rule: Option<String>,
    /// One or more employee names (`Сотрудник`).
    pub employee: Option<String>,
    /// One or more specializations (`Специализация`).
    pub specialization: Cell,
    /// The commission value (`Процент в ЗП`).
    pub rate_value: RateValue,
}

/// One normalized rule: a single employee paired with a single specialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRow {
    /// The forward-filled rule label of the source row.
    pub rule: String,
    /// The employee name.
    pub employee: String,
    /// The specialization name.
    pub specialization: String,
    /// The commission value copied from the source row.
    pub rate_value: RateValue,
}

/// An insertion-ordered collection of [`RuleRow`].
///
/// # Example
///
/// ```
/// use commission_engine::models::{RateValue, RuleRow, RuleTable};
/// use rust_decimal::Decimal;
///
/// let table = RuleTable::new(vec![
///     RuleRow {
///         rule: "Мастер".to_string(),
///         employee: "Иванова Анна".to_string(),
///         specialization: "МАНИКЮР-ПЕДИКЮР".to_string(),
///         rate_value: RateValue::Number(Decimal::new(4, 1)),
///     },
/// ]);
/// assert_eq!(table.len(), 1);
/// assert!(table.rates().contains_key("МАНИКЮР-ПЕДИКЮР"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleTable {
    rows: Vec<RuleRow>,
}

impl RuleTable {
    /// Creates a table from rows in their emission order.
    pub fn new(rows: Vec<RuleRow>) -> Self {
        Self { rows }
    }

    /// Returns all rows.
    pub fn rows(&self) -> &[RuleRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a new table holding the rows accepted by `predicate`.
    pub fn narrow<F>(&self, mut predicate: F) -> RuleTable
    where
        F: FnMut(&RuleRow) -> bool,
    {
        RuleTable {
            rows: self
                .rows
                .iter()
                .filter(|row| predicate(row))
                .cloned()
                .collect(),
        }
    }

    /// Builds the specialization to rate mapping.
    ///
    /// When a specialization repeats, the later rate wins while the key keeps
    /// the position of its first occurrence.
    pub fn rates(&self) -> IndexMap<String, RateValue> {
        let mut rates = IndexMap::with_capacity(self.rows.len());
        for row in &self.rows {
            rates.insert(row.specialization.clone(), row.rate_value.clone());
        }
        rates
    }
}
