//! Loader: CSV and XLSX bytes to [`Table`].
//!
//! Dispatches on the file extension. CSV input goes through encoding
//! detection first so Latin-1 / Windows-1252 exports load; XLSX input is
//! read from its first worksheet (see [`xlsx`]).
//!
//! Both formats share the same header normalization, missing-value markers
//! and per-column type inference.

pub mod xlsx;

use std::collections::HashSet;
use std::path::Path;

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::error::{LoadError, LoadResult};
use crate::models::{Cell, Column, ColumnKind, Table};

/// Tokens read as missing values, besides empty cells.
pub const NA_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "#NA",
    "<NA>", "-1.#IND", "1.#QNAN", "#N/A N/A", "-1.#QNAN", "1.#IND",
];

// =============================================================================
// Source formats
// =============================================================================

/// Input formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    /// Map an extension (with leading dot, any case) to a format.
    pub fn from_extension(extension: &str) -> LoadResult<Self> {
        match extension.to_lowercase().as_str() {
            ".csv" => Ok(SourceFormat::Csv),
            ".xlsx" => Ok(SourceFormat::Xlsx),
            _ => Err(LoadError::UnsupportedFormat(extension.to_lowercase())),
        }
    }
}

/// Lower-cased extension of `file_name`, with its leading dot.
///
/// Returns an empty string when there is none; a leading dot alone
/// (`.csv`) names a hidden file, not an extension.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

// =============================================================================
// Loading
// =============================================================================

/// Loader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Uploads larger than this are rejected before parsing.
    pub max_bytes: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Parse `bytes` according to `extension` with default options.
///
/// # Example
/// ```ignore
/// use tabshift::parser::load;
///
/// let table = load(b"name,score\nAlice,10", ".csv").unwrap();
/// assert_eq!(table.column_names(), vec!["name", "score"]);
/// ```
pub fn load(bytes: &[u8], extension: &str) -> LoadResult<Table> {
    load_with(bytes, extension, &LoadOptions::default())
}

/// Parse `bytes` according to `extension`.
pub fn load_with(bytes: &[u8], extension: &str, options: &LoadOptions) -> LoadResult<Table> {
    let format = SourceFormat::from_extension(extension)?;

    if bytes.len() > options.max_bytes {
        return Err(LoadError::TooLarge {
            size: bytes.len(),
            limit: options.max_bytes,
        });
    }

    match format {
        SourceFormat::Csv => parse_csv_bytes(bytes),
        SourceFormat::Xlsx => xlsx::parse_xlsx_bytes(bytes),
    }
}

/// Read a file from disk and parse it according to its extension.
pub fn load_file<P: AsRef<Path>>(path: P) -> LoadResult<Table> {
    load_file_with(path, &LoadOptions::default())
}

/// [`load_file`] with explicit options.
pub fn load_file_with<P: AsRef<Path>>(path: P, options: &LoadOptions) -> LoadResult<Table> {
    let path = path.as_ref();
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    // Reject before reading the whole file
    SourceFormat::from_extension(&extension_of(name))?;
    let bytes = std::fs::read(path)?;
    load_with(&bytes, &extension_of(name), options)
}

// =============================================================================
// CSV
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "iso-8859-15" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Parse CSV bytes with encoding auto-detection.
pub fn parse_csv_bytes(bytes: &[u8]) -> LoadResult<Table> {
    if bytes.is_empty() {
        return Err(LoadError::Empty);
    }
    let content = match std::str::from_utf8(bytes) {
        Ok(s) => s.strip_prefix('\u{feff}').unwrap_or(s).to_string(),
        Err(_) => {
            let encoding = detect_encoding(bytes);
            decode_content(bytes, &encoding)
        }
    };
    parse_csv_str(&content)
}

/// Parse comma-separated text with a header row.
pub fn parse_csv_str(content: &str) -> LoadResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let header = loop {
        match records.next() {
            None => return Err(LoadError::Empty),
            Some(record) => {
                let record = record?;
                if !is_blank(&record, content) {
                    break record;
                }
            }
        }
    };

    let headers = normalize_headers(header.iter().map(|h| h.to_string()).collect());
    let width = headers.len();
    let mut rows: Vec<Vec<Cell>> = Vec::new();

    for record in records {
        let record = record?;
        if is_blank(&record, content) {
            continue;
        }
        if record.len() > width {
            return Err(LoadError::Malformed {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: width,
                found: record.len(),
            });
        }
        rows.push(record.iter().map(text_cell).collect());
    }

    Ok(build_table(headers, rows))
}

/// Whether the raw input line behind `record` holds only whitespace.
///
/// A quoted empty field (`""`) is a real row with one missing cell.
fn is_blank(record: &csv::StringRecord, content: &str) -> bool {
    if record.len() != 1 || !record[0].trim().is_empty() {
        return false;
    }
    let start = match record.position() {
        Some(pos) => pos.byte() as usize,
        None => return false,
    };
    content
        .get(start..)
        .and_then(|rest| rest.lines().next())
        .map_or(true, |line| line.trim().is_empty())
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Whether a raw text value counts as missing.
pub fn is_missing_marker(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NA_MARKERS.contains(&trimmed)
}

/// Classify raw text as missing or text.
pub(crate) fn text_cell(raw: &str) -> Cell {
    if is_missing_marker(raw) {
        Cell::Missing
    } else {
        Cell::Text(raw.to_string())
    }
}

/// Parse a trimmed number; NaN is not a number here.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Fill empty names with `Unnamed: <index>` and suffix repeats with `.1`, `.2`, ...
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let named: Vec<String> = raw
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            if name.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name
            }
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(named.len());

    for name in named {
        if taken.insert(name.clone()) {
            result.push(name);
            continue;
        }
        let mut counter = 1;
        let unique = loop {
            let candidate = format!("{}.{}", name, counter);
            if !taken.contains(&candidate) {
                break candidate;
            }
            counter += 1;
        };
        taken.insert(unique.clone());
        result.push(unique);
    }

    result
}

/// Infer a column's kind and convert its cells accordingly.
///
/// Numeric when the column has rows and every non-missing cell is a number
/// or parses as one. Text columns keep their cells unchanged.
pub fn infer_column(name: String, cells: Vec<Cell>) -> Column {
    if cells.is_empty() {
        return Column::new(name, ColumnKind::Text, cells);
    }

    let numeric = cells.iter().all(|cell| match cell {
        Cell::Missing | Cell::Number(_) => true,
        Cell::Text(s) => parse_number(s).is_some(),
    });

    if !numeric {
        return Column::new(name, ColumnKind::Text, cells);
    }

    let cells = cells
        .into_iter()
        .map(|cell| match cell {
            Cell::Text(s) => parse_number(&s).map(Cell::Number).unwrap_or(Cell::Missing),
            other => other,
        })
        .collect();

    Column::new(name, ColumnKind::Numeric, cells)
}

/// Transpose row-major cells into inferred columns, padding short rows.
pub(crate) fn build_table(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Table {
    let width = headers.len();
    let mut columns: Vec<Vec<Cell>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();

    for row in rows {
        let mut cells = row.into_iter();
        for column in columns.iter_mut() {
            column.push(cells.next().unwrap_or(Cell::Missing));
        }
    }

    Table::new(
        headers
            .into_iter()
            .zip(columns)
            .map(|(name, cells)| infer_column(name, cells))
            .collect(),
    )
}
