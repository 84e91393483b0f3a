//! XLSX loading through calamine.
//!
//! Only the first worksheet is read. Its used range is treated as a
//! rectangle whose first row holds the column names. Blank rows inside the
//! range load as rows of missing values; blank rows after the last written
//! cell are outside the range and do not exist.

use std::io::Cursor;

use calamine::{Data, DataType, Reader, Xlsx};

use super::{build_table, normalize_headers, text_cell};
use crate::error::{LoadError, LoadResult};
use crate::models::{format_number, Cell, Table};

/// Format used for date-time cells.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse the first worksheet of an XLSX workbook.
pub fn parse_xlsx_bytes(bytes: &[u8]) -> LoadResult<Table> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LoadError::NoWorksheet)??;

    let mut rows = range.rows();
    let header = rows.next().ok_or(LoadError::Empty)?;

    let headers = normalize_headers(header.iter().map(header_name).collect());
    // Empty rows inside the used range are rows of missing values
    let body: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(build_table(headers, body))
}

/// Header text for a cell; blanks are named later by `normalize_headers`.
fn header_name(data: &Data) -> String {
    match cell_from_data(data) {
        Cell::Missing => String::new(),
        Cell::Number(n) => format_number(n),
        Cell::Text(s) => s,
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) if f.is_nan() => Cell::Missing,
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => text_cell(s),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(_) => data
            .as_datetime()
            .map(|dt| Cell::Text(dt.format(DATETIME_FORMAT).to_string()))
            .unwrap_or(Cell::Missing),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        _ => Cell::Missing,
    }
}
