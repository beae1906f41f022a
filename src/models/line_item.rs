//! Transaction line item model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Cell;

/// Column holding the procedure name.
pub const PROCEDURE_COLUMN: usize = 0;
/// Column holding the quantity.
pub const QUANTITY_COLUMN: usize = 1;
/// Column holding the gross price.
pub const GROSS_PRICE_COLUMN: usize = 6;

/// One row of a transaction sheet.
///
/// Only the procedure name, quantity and gross price take part in the
/// calculation; other columns are carried through to the output untouched.
///
/// # Example
///
/// ```
/// use commission_engine::models::{Cell, LineItem};
/// use rust_decimal::Decimal;
///
/// let cells = vec![
///     Cell::Text("СТРИЖКИ".to_string()),
///     Cell::Number(Decimal::from(2)),
///     Cell::Empty,
///     Cell::Empty,
///     Cell::Empty,
///     Cell::Empty,
///     Cell::Number(Decimal::from(3000)),
/// ];
/// let item = LineItem::from_cells(1, &cells);
/// assert!(item.is_payable());
/// assert_eq!(item.gross_price, Some(Decimal::from(3000)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Zero-based sheet row the item was read from.
    pub row_index: usize,
    /// The procedure or category name.
    pub procedure_name: Option<String>,
    /// The number of units sold.
    pub quantity: Option<Decimal>,
    /// The gross revenue of the row.
    pub gross_price: Option<Decimal>,
}

impl LineItem {
    /// Reads a line item from the cells of one sheet row.
    pub fn from_cells(row_index: usize, cells: &[Cell]) -> Self {
        Self {
            row_index,
            procedure_name: cells.get(PROCEDURE_COLUMN).and_then(Cell::as_text),
            quantity: cells.get(QUANTITY_COLUMN).and_then(Cell::as_decimal),
            gross_price: cells.get(GROSS_PRICE_COLUMN).and_then(Cell::as_decimal),
        }
    }

    /// Returns `true` when the row has a procedure name and a non-zero quantity.
    pub fn is_payable(&self) -> bool {
        self.procedure_name.is_some() && self.quantity.is_some_and(|q| !q.is_zero())
    }
}
