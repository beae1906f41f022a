//! Spreadsheet storage.
//!
//! [`WorkbookStore`] is the seam between the engine and the filesystem.
//! [`FileWorkbookStore`] reads with `calamine`, edits existing `.xlsx` files in
//! place with `umya-spreadsheet` and writes new ones with `rust_xlsxwriter`;
//! [`MemoryWorkbookStore`] keeps sheets in memory for tests and benchmarks.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, Sheets, open_workbook_auto_from_rs};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{Cell, Sheet, column_name};

/// Number format given to date cells of converted legacy workbooks.
const DATE_FORMAT: &str = "dd.mm.yyyy";

/// Spreadsheet I/O used by the batch runner and the file processor.
pub trait WorkbookStore {
    /// Lists the regular files of `dir`, sorted by path.
    fn list_workbooks(&self, dir: &Path) -> EngineResult<Vec<PathBuf>>;

    /// Creates `dir` and its parents when missing.
    fn ensure_dir(&self, dir: &Path) -> EngineResult<()>;

    /// Copies a workbook byte for byte, replacing `to` if it exists.
    fn copy_workbook(&self, from: &Path, to: &Path) -> EngineResult<()>;

    /// Reads one sheet; `None` selects the first sheet.
    fn read_sheet(&self, path: &Path, sheet: Option<&str>) -> EngineResult<Sheet>;

    /// Writes `sheet` as the only sheet of a new `.xlsx` workbook at `path`.
    fn write_sheet(&self, path: &Path, sheet: &Sheet) -> EngineResult<()>;

    /// Applies `edit` to the first sheet of the `.xlsx` workbook at `path` and
    /// saves it. Other sheets and the formatting are kept.
    fn edit_sheet(&self, path: &Path, edit: &SheetEdit) -> EngineResult<()>;

    /// Converts a legacy `.xls` workbook to `.xlsx` next to it, removes the
    /// legacy file and returns the new path.
    fn convert_legacy(&self, path: &Path) -> EngineResult<PathBuf>;
}

/// Changes to one sheet, applied in three steps: `cells` are written, the
/// `removed_columns` are deleted one after another, then `trailing_cells` are
/// written against the shifted layout.
///
/// Positions are zero-based. Empty cells are skipped.
///
/// # Example
///
/// ```
/// use commission_engine::models::{Cell, Sheet};
/// use commission_engine::processing::SheetEdit;
///
/// let mut sheet = Sheet::from_text_rows("Лист1", &[&["A", "B", "C"]]);
/// let edit = SheetEdit {
///     cells: vec![(0, 3, Cell::Text("D".to_string()))],
///     removed_columns: vec![1],
///     trailing_cells: vec![(1, 2, Cell::Formula("=SUM(C1:C1)".to_string()))],
/// };
/// edit.apply(&mut sheet);
///
/// assert_eq!(sheet.cell(0, 1), &Cell::Text("C".to_string()));
/// assert_eq!(sheet.cell(0, 2), &Cell::Text("D".to_string()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetEdit {
    /// `(row, column, value)` written before any deletion.
    pub cells: Vec<(usize, usize, Cell)>,
    /// Columns deleted in order.
    pub removed_columns: Vec<usize>,
    /// `(row, column, value)` written after the deletions.
    pub trailing_cells: Vec<(usize, usize, Cell)>,
}

impl SheetEdit {
    /// Applies the edit to an in-memory sheet.
    pub fn apply(&self, sheet: &mut Sheet) {
        for (row, col, cell) in non_empty(&self.cells) {
            sheet.set(row, col, cell.clone());
        }
        for &col in &self.removed_columns {
            sheet.delete_column(col);
        }
        for (row, col, cell) in non_empty(&self.trailing_cells) {
            sheet.set(row, col, cell.clone());
        }
    }

    fn apply_to_worksheet(&self, worksheet: &mut umya_spreadsheet::Worksheet) {
        for (row, col, cell) in non_empty(&self.cells) {
            write_umya_cell(worksheet, row, col, cell);
        }
        for &col in &self.removed_columns {
            worksheet.remove_column(&column_name(col), &1);
        }
        for (row, col, cell) in non_empty(&self.trailing_cells) {
            write_umya_cell(worksheet, row, col, cell);
        }
    }
}

fn non_empty(cells: &[(usize, usize, Cell)]) -> impl Iterator<Item = (usize, usize, &Cell)> {
    cells
        .iter()
        .filter(|(_, _, cell)| !matches!(cell, Cell::Empty))
        .map(|(row, col, cell)| (*row, *col, cell))
}

fn write_umya_cell(worksheet: &mut umya_spreadsheet::Worksheet, row: usize, col: usize, cell: &Cell) {
    let coordinate = format!("{}{}", column_name(col), row + 1);
    let target = worksheet.get_cell_mut(coordinate.as_str());
    match cell {
        Cell::Empty => {}
        Cell::Text(text) => {
            target.set_value_string(text.as_str());
        }
        Cell::Number(value) => {
            target.set_value_number(value.to_f64().unwrap_or_default());
        }
        Cell::Formula(formula) => {
            target.set_formula(formula.trim_start_matches('='));
        }
    }
}

/// Filesystem-backed [`WorkbookStore`].
#[derive(Debug, Clone, Default)]
pub struct FileWorkbookStore {
    password: Option<String>,
}

impl FileWorkbookStore {
    /// Creates a store.
    ///
    /// `password` is the configured workbook password. A workbook that the
    /// reader cannot open is decrypted with it before a second attempt.
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    fn open(&self, path: &Path) -> EngineResult<Sheets<Cursor<Vec<u8>>>> {
        let bytes = fs::read(path).map_err(|e| EngineError::io(path, e))?;
        let plain_error = match open_workbook_auto_from_rs(Cursor::new(bytes.clone())) {
            Ok(workbook) => return Ok(workbook),
            Err(e) => e,
        };
        let Some(password) = self.password.as_deref() else {
            return Err(EngineError::workbook(path, plain_error));
        };

        let decrypted = office_crypto::decrypt_from_bytes(bytes, password).map_err(|e| {
            EngineError::workbook(path, format!("{plain_error}; decryption failed: {e:?}"))
        })?;
        debug!(file = %path.display(), "Decrypted protected workbook");
        open_workbook_auto_from_rs(Cursor::new(decrypted)).map_err(|e| EngineError::workbook(path, e))
    }

    fn read_ranges(&self, path: &Path) -> EngineResult<Vec<(String, Range<Data>)>> {
        let mut workbook = self.open(path)?;
        let mut ranges = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| EngineError::workbook(path, e))?;
            ranges.push((name, range));
        }
        Ok(ranges)
    }

    fn write_all(&self, path: &Path, sheet: &Sheet) -> EngineResult<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        if !sheet.name.is_empty() {
            worksheet
                .set_name(&sheet.name)
                .map_err(|e| EngineError::workbook(path, e))?;
        }
        for (row, cells) in sheet.rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let (row, col) = cell_position(path, row, col)?;
                let written = match cell {
                    Cell::Empty => continue,
                    Cell::Text(text) => worksheet.write_string(row, col, text),
                    Cell::Number(value) => {
                        worksheet.write_number(row, col, value.to_f64().unwrap_or_default())
                    }
                    Cell::Formula(formula) => worksheet.write_formula(row, col, formula.as_str()),
                };
                written.map_err(|e| EngineError::workbook(path, e))?;
            }
        }
        workbook.save(path).map_err(|e| EngineError::workbook(path, e))
    }

    /// Writes every sheet of a legacy workbook, keeping numbers, booleans
    /// and dates typed.
    fn write_ranges(&self, path: &Path, ranges: &[(String, Range<Data>)]) -> EngineResult<()> {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format(DATE_FORMAT);
        for (name, range) in ranges {
            let worksheet = workbook.add_worksheet();
            worksheet
                .set_name(name)
                .map_err(|e| EngineError::workbook(path, e))?;
            let (top, left) = range.start().unwrap_or_default();
            for (row, col, data) in range.used_cells() {
                let (row, col) = cell_position(path, top as usize + row, left as usize + col)?;
                let written = match data {
                    Data::Empty | Data::Error(_) => continue,
                    Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
                        worksheet.write_string(row, col, text)
                    }
                    Data::Int(value) => worksheet.write_number(row, col, *value as f64),
                    Data::Float(value) => worksheet.write_number(row, col, *value),
                    Data::Bool(value) => worksheet.write_boolean(row, col, *value),
                    Data::DateTime(value) => {
                        worksheet.write_number_with_format(row, col, value.as_f64(), &date_format)
                    }
                };
                written.map_err(|e| EngineError::workbook(path, e))?;
            }
        }
        workbook.save(path).map_err(|e| EngineError::workbook(path, e))
    }
}

fn cell_position(path: &Path, row: usize, col: usize) -> EngineResult<(u32, u16)> {
    match (u32::try_from(row), u16::try_from(col)) {
        (Ok(row), Ok(col)) => Ok((row, col)),
        _ => Err(EngineError::workbook(
            path,
            format!("cell ({row}, {col}) is outside the worksheet limits"),
        )),
    }
}

/// Converts a calamine value into a [`Cell`].
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::Int(value) => Cell::Number(Decimal::from(*value)),
        Data::Float(value) => Decimal::from_f64(*value)
            .map(Cell::Number)
            .unwrap_or_else(|| Cell::Text(value.to_string())),
        Data::Bool(value) => Cell::Text(value.to_string()),
        Data::DateTime(value) => Cell::Text(value.to_string()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => Cell::Text(value.clone()),
    }
}

/// Builds a [`Sheet`] from a calamine range, keeping absolute positions.
///
/// Calamine ranges start at the first non-empty cell; the leading rows and
/// columns are restored as empty cells.
pub fn sheet_from_range(name: &str, range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::new(name);
    let Some((top, left)) = range.start() else {
        return sheet;
    };
    let (top, left) = (top as usize, left as usize);

    sheet.rows = vec![Vec::new(); top];
    for cells in range.rows() {
        let mut row = vec![Cell::Empty; left];
        row.extend(cells.iter().map(cell_from_data));
        while matches!(row.last(), Some(Cell::Empty)) {
            row.pop();
        }
        sheet.rows.push(row);
    }
    sheet
}

impl WorkbookStore for FileWorkbookStore {
    fn list_workbooks(&self, dir: &Path) -> EngineResult<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| EngineError::io(dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::io(dir, e))?;
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        debug!(dir = %dir.display(), files = paths.len(), "Listed input folder");
        Ok(paths)
    }

    fn ensure_dir(&self, dir: &Path) -> EngineResult<()> {
        fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))
    }

    fn copy_workbook(&self, from: &Path, to: &Path) -> EngineResult<()> {
        fs::copy(from, to).map_err(|e| EngineError::io(from, e))?;
        Ok(())
    }

    fn read_sheet(&self, path: &Path, sheet: Option<&str>) -> EngineResult<Sheet> {
        let mut workbook = self.open(path)?;
        let name = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .into_iter()
                .next()
                .ok_or_else(|| EngineError::workbook(path, "workbook has no sheets"))?,
        };
        if !workbook.sheet_names().contains(&name) {
            return Err(EngineError::SheetNotFound {
                path: path.display().to_string(),
                sheet: name,
            });
        }
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| EngineError::workbook(path, e))?;
        Ok(sheet_from_range(&name, &range))
    }

    fn write_sheet(&self, path: &Path, sheet: &Sheet) -> EngineResult<()> {
        self.write_all(path, sheet)
    }

    fn edit_sheet(&self, path: &Path, edit: &SheetEdit) -> EngineResult<()> {
        let mut book =
            umya_spreadsheet::reader::xlsx::read(path).map_err(|e| EngineError::workbook(path, e))?;
        let worksheet = book
            .get_sheet_mut(&0)
            .ok_or_else(|| EngineError::workbook(path, "workbook has no sheets"))?;
        edit.apply_to_worksheet(worksheet);
        umya_spreadsheet::writer::xlsx::write(&book, path).map_err(|e| EngineError::workbook(path, e))
    }

    fn convert_legacy(&self, path: &Path) -> EngineResult<PathBuf> {
        let target = path.with_extension("xlsx");
        let ranges = self.read_ranges(path)?;
        if let Err(e) = self.write_ranges(&target, &ranges) {
            if target.exists() {
                if let Err(cleanup) = fs::remove_file(&target) {
                    warn!(file = %target.display(), error = %cleanup, "Failed to remove partial conversion");
                }
            }
            return Err(e);
        }
        fs::remove_file(path).map_err(|e| EngineError::io(path, e))?;
        debug!(from = %path.display(), to = %target.display(), "Converted legacy workbook");
        Ok(target)
    }
}

/// In-memory [`WorkbookStore`] keyed by path, one sheet per workbook.
///
/// # Example
///
/// ```
/// use commission_engine::models::Sheet;
/// use commission_engine::processing::{MemoryWorkbookStore, WorkbookStore};
/// use std::path::Path;
///
/// let store = MemoryWorkbookStore::new();
/// store.insert("in/Иванова.xlsx", Sheet::from_text_rows("Лист1", &[&["Наименование"]]));
/// assert_eq!(store.list_workbooks(Path::new("in")).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryWorkbookStore {
    sheets: RefCell<BTreeMap<PathBuf, Sheet>>,
}

impl MemoryWorkbookStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `sheet` at `path`, replacing any previous workbook.
    pub fn insert(&self, path: impl Into<PathBuf>, sheet: Sheet) {
        self.sheets.borrow_mut().insert(path.into(), sheet);
    }

    /// Returns a copy of the workbook at `path`.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Sheet> {
        self.sheets.borrow().get(path.as_ref()).cloned()
    }

    /// Returns `true` when a workbook exists at `path`.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.sheets.borrow().contains_key(path.as_ref())
    }

    /// Removes the workbooks under `dir`.
    pub fn clear_dir(&self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        self.sheets
            .borrow_mut()
            .retain(|path, _| path.parent() != Some(dir));
    }

    fn not_found(path: &Path) -> EngineError {
        EngineError::io(path, std::io::Error::from(std::io::ErrorKind::NotFound))
    }
}

impl WorkbookStore for MemoryWorkbookStore {
    fn list_workbooks(&self, dir: &Path) -> EngineResult<Vec<PathBuf>> {
        Ok(self
            .sheets
            .borrow()
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn ensure_dir(&self, _dir: &Path) -> EngineResult<()> {
        Ok(())
    }

    fn copy_workbook(&self, from: &Path, to: &Path) -> EngineResult<()> {
        let sheet = self.get(from).ok_or_else(|| Self::not_found(from))?;
        self.insert(to, sheet);
        Ok(())
    }

    fn read_sheet(&self, path: &Path, sheet: Option<&str>) -> EngineResult<Sheet> {
        let stored = self.get(path).ok_or_else(|| Self::not_found(path))?;
        match sheet {
            Some(name) if stored.name != name => Err(EngineError::SheetNotFound {
                path: path.display().to_string(),
                sheet: name.to_string(),
            }),
            _ => Ok(stored),
        }
    }

    fn write_sheet(&self, path: &Path, sheet: &Sheet) -> EngineResult<()> {
        self.insert(path, sheet.clone());
        Ok(())
    }

    fn edit_sheet(&self, path: &Path, edit: &SheetEdit) -> EngineResult<()> {
        let mut sheet = self.get(path).ok_or_else(|| Self::not_found(path))?;
        edit.apply(&mut sheet);
        self.insert(path, sheet);
        Ok(())
    }

    fn convert_legacy(&self, path: &Path) -> EngineResult<PathBuf> {
        let sheet = self
            .sheets
            .borrow_mut()
            .remove(path)
            .ok_or_else(|| Self::not_found(path))?;
        let target = path.with_extension("xlsx");
        self.insert(&target, sheet);
        Ok(target)
    }
}
