//! Domain models for the Tabshift pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Table`] - Ordered, named, equal-length columns plus a row count
//! - [`Column`] - One named column with its inferred [`ColumnKind`]
//! - [`Cell`] - A single value (missing, number or text)
//! - [`ColumnSelection`] - Order-preserving subset of a table's columns
//! - [`CleaningOptions`] - Which cleaning operations to run
//! - [`ExportFormat`] / [`ExportArtifact`] - Conversion target and result
//! - [`UploadedFile`] / [`FileId`] - A unit of work in a batch

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::CleanError;

// =============================================================================
// Cells
// =============================================================================

/// A single table value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Empty or NA cell. Serialized as `null`.
    Missing,
    /// Numeric value.
    Number(f64),
    /// Any other value.
    Text(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Bit pattern used for equality and hashing; `-0.0` folds onto `0.0`.
    fn number_bits(n: f64) -> u64 {
        if n == 0.0 {
            0.0f64.to_bits()
        } else {
            n.to_bits()
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Missing, Cell::Missing) => true,
            (Cell::Number(a), Cell::Number(b)) => Cell::number_bits(*a) == Cell::number_bits(*b),
            (Cell::Text(a), Cell::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Cell::Missing => 0u8.hash(state),
            Cell::Number(n) => {
                1u8.hash(state);
                Cell::number_bits(*n).hash(state);
            }
            Cell::Text(s) => {
                2u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Cell {
    /// Renders the cell the way the CSV exporter writes it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Number(n) => f.write_str(&format_number(*n)),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Format a number for text output.
///
/// Whole numbers print without a fractional part, infinities as `inf`/`-inf`.
pub fn format_number(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        // -0.0 prints as "0"
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// =============================================================================
// Columns
// =============================================================================

/// Inferred semantic type of a column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Every non-missing cell is a number.
    Numeric,
    /// Anything else.
    Text,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => f.write_str("numeric"),
            ColumnKind::Text => f.write_str("text"),
        }
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            kind,
            cells,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }
}

// =============================================================================
// Table
// =============================================================================

/// In-memory rectangular dataset.
///
/// The row count is stored explicitly so that a projection onto zero
/// columns still remembers how many rows the table had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Build a table from columns. All columns must have the same length.
    ///
    /// # Panics
    /// Panics if column lengths differ; loaders always pad rows first.
    pub fn new(columns: Vec<Column>) -> Self {
        let row_count = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        assert!(
            columns.iter().all(|c| c.cells.len() == row_count),
            "all columns of a table must have the same length"
        );
        Self { columns, row_count }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Cells of row `index`, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Cell>> {
        if index >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.cells[index]).collect())
    }

    /// Iterate rows as vectors of cell references.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.row_count).map(move |i| self.columns.iter().map(|c| &c.cells[i]).collect())
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Keep only rows whose flag is `true`.
    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.row_count);
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column.cells.retain(|_| *flags.next().unwrap_or(&true));
        }
        self.row_count = keep.iter().filter(|k| **k).count();
    }

    /// Keep only columns whose name passes `keep`, preserving order.
    pub(crate) fn retain_columns(&mut self, mut keep: impl FnMut(&Column) -> bool) {
        self.columns.retain(|c| keep(c));
    }
}

// =============================================================================
// Column selection
// =============================================================================

/// Order-preserving subset of a table's column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    names: Vec<String>,
}

impl ColumnSelection {
    /// Select `names` from `table`.
    ///
    /// The resulting order follows the table, not `names`. Repeated names
    /// collapse; a name the table lacks is an error.
    pub fn from_names<S: AsRef<str>>(table: &Table, names: &[S]) -> Result<Self, CleanError> {
        if let Some(unknown) = names
            .iter()
            .map(AsRef::as_ref)
            .find(|n| table.column(n).is_none())
        {
            return Err(CleanError::UnknownColumn(unknown.to_string()));
        }

        let names = table
            .columns()
            .iter()
            .filter(|c| names.iter().any(|n| n.as_ref() == c.name))
            .map(|c| c.name.clone())
            .collect();

        Ok(Self { names })
    }

    /// Every column of `table`.
    pub fn all(table: &Table) -> Self {
        Self {
            names: table.column_names(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

// =============================================================================
// Cleaning options
// =============================================================================

/// User-toggled cleaning operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleaningOptions {
    /// Drop rows that repeat an earlier row.
    pub remove_duplicates: bool,
    /// Replace missing numeric cells with the column mean.
    pub fill_missing_numeric: bool,
    /// Columns to keep (`None` keeps all).
    pub keep_columns: Option<Vec<String>>,
}

// =============================================================================
// Export
// =============================================================================

pub const CSV_MIME: &str = "text/csv";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Conversion target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => ".csv",
            ExportFormat::Xlsx => ".xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_MIME,
            ExportFormat::Xlsx => XLSX_MIME,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("CSV"),
            ExportFormat::Xlsx => f.write_str("Excel"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" | ".csv" => Ok(ExportFormat::Csv),
            "xlsx" | ".xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(format!("unknown export format '{}' (expected csv or xlsx)", other)),
        }
    }
}

/// Serialized table ready for download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: &'static str,
}

// =============================================================================
// Uploads
// =============================================================================

/// A file received from the user.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Identifies one file within a batch: upload position plus name.
///
/// Two uploads sharing a name get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileId {
    pub index: usize,
    pub name: String,
}

impl FileId {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.index)
    }
}
