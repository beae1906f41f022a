//! Tabular sheet model shared by readers, the engine and writers.
//!
//! A [`Sheet`] is a dense grid of [`Cell`] values addressed by zero-based
//! row and column indices. Row 0 of a transaction sheet is its header row.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static EMPTY_CELL: Cell = Cell::Empty;

/// A single spreadsheet cell value.
///
/// # Example
///
/// ```
/// use commission_engine::models::Cell;
/// use rust_decimal::Decimal;
///
/// assert!(Cell::Empty.is_blank());
/// assert!(Cell::Text("  ".to_string()).is_blank());
/// assert_eq!(Cell::Text(" 3 ".to_string()).as_decimal(), Some(Decimal::from(3)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    /// No value.
    Empty,
    /// A text value.
    Text(String),
    /// A numeric value.
    Number(Decimal),
    /// A formula, stored with its leading `=`.
    Formula(String),
}

impl Cell {
    /// Returns `true` for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(_) | Cell::Formula(_) => false,
        }
    }

    /// Returns the trimmed text of the cell, rendering numbers as text.
    ///
    /// Blank cells and formulas yield `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(value) => Some(value.normalize().to_string()),
            Cell::Empty | Cell::Formula(_) => None,
        }
    }

    /// Returns the numeric value of the cell.
    ///
    /// Text is accepted when it parses as a decimal after trimming; a comma
    /// decimal separator is tolerated.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(text) => {
                let normalized = text.trim().replace(',', ".");
                Decimal::from_str(&normalized).ok()
            }
            Cell::Empty | Cell::Formula(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(text) | Cell::Formula(text) => f.write_str(text),
            Cell::Number(value) => write!(f, "{}", value.normalize()),
        }
    }
}

/// A named worksheet held in memory.
///
/// # Example
///
/// ```
/// use commission_engine::models::{Cell, Sheet};
///
/// let mut sheet = Sheet::new("Лист1");
/// sheet.set(2, 3, Cell::Text("x".to_string()));
/// assert_eq!(sheet.row_count(), 3);
/// assert_eq!(sheet.width(), 4);
/// assert_eq!(sheet.cell(0, 0), &Cell::Empty);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sheet {
    /// The worksheet name.
    pub name: String,
    /// Rows of cells; rows may have different lengths.
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Creates an empty sheet with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Creates a sheet from text rows; empty strings become [`Cell::Empty`].
    ///
    /// Numeric-looking strings stay text; use [`Sheet::set`] for numbers.
    pub fn from_text_rows(name: impl Into<String>, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|value| {
                        if value.is_empty() {
                            Cell::Empty
                        } else {
                            Cell::Text((*value).to_string())
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Number of rows in the sheet.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Returns the cell at `(row, col)`, or an empty cell when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Sets the cell at `(row, col)`, growing the grid as needed.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = cell;
    }

    /// Removes column `col` from every row that reaches it, shifting later
    /// cells left.
    pub fn delete_column(&mut self, col: usize) {
        for cells in &mut self.rows {
            if col < cells.len() {
                cells.remove(col);
            }
        }
    }
}

/// Converts a zero-based column index into spreadsheet letters (`0` is `A`).
///
/// # Example
///
/// ```
/// use commission_engine::models::column_name;
///
/// assert_eq!(column_name(0), "A");
/// assert_eq!(column_name(25), "Z");
/// assert_eq!(column_name(26), "AA");
/// ```
pub fn column_name(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts spreadsheet letters into a zero-based column index (`A` is `0`).
pub fn column_index(name: &str) -> Option<usize> {
    if name.is_empty() {
        return None;
    }
    name.chars().try_fold(0usize, |acc, ch| {
        ch.is_ascii_alphabetic()
            .then(|| acc * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1))
    })
    .map(|n| n - 1)
}
