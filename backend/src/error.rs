//! Error types for the Tabshift pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`LoadError`] - Reading CSV/XLSX bytes into a table
//! - [`CleanError`] - Cleaning operations (column selection)
//! - [`ExportError`] - Serializing a table to CSV/XLSX
//! - [`PipelineError`] - Any of the above, for one file
//! - [`FileFailure`] - A pipeline error tagged with the file it belongs to
//! - [`ConfigError`] - Runtime configuration
//! - [`ServerError`] - HTTP layer
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::FileId;

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while turning uploaded bytes into a table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File extension is neither `.csv` nor `.xlsx`.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Upload exceeds the configured size limit.
    #[error("File is too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: usize, limit: usize },

    /// No header row.
    #[error("No columns to parse from file")]
    Empty,

    /// A data row has more fields than the header.
    #[error("Line {line}: expected {expected} fields, saw {found}")]
    Malformed {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// CSV reader failure.
    #[error("Invalid CSV: {0}")]
    Csv(String),

    /// Spreadsheet reader failure.
    #[error("Invalid spreadsheet: {0}")]
    Xlsx(String),

    /// Workbook contains no worksheet.
    #[error("Workbook has no worksheets")]
    NoWorksheet,

    /// Failed to read file from disk.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for LoadError {
    fn from(e: csv::Error) -> Self {
        LoadError::Csv(e.to_string())
    }
}

impl From<calamine::XlsxError> for LoadError {
    fn from(e: calamine::XlsxError) -> Self {
        LoadError::Xlsx(e.to_string())
    }
}

// =============================================================================
// Cleaning Errors
// =============================================================================

/// Errors from cleaning operations.
#[derive(Debug, Error)]
pub enum CleanError {
    /// Selection names a column the table does not have.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing a table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer failure.
    #[error("CSV export failed: {0}")]
    Csv(String),

    /// Spreadsheet writer failure.
    #[error("Excel export failed: {0}")]
    Xlsx(String),

    /// Table does not fit in one worksheet.
    #[error("Table too large for a worksheet: {rows} rows x {columns} columns")]
    TooLarge { rows: usize, columns: usize },
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::Csv(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ExportError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ExportError::Xlsx(e.to_string())
    }
}

// =============================================================================
// Pipeline Errors
// =============================================================================

/// Anything that stops one file from being processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Clean(#[from] CleanError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl PipelineError {
    /// Stable error code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Load(e) => match e {
                LoadError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
                LoadError::TooLarge { .. } => "FILE_TOO_LARGE",
                LoadError::Empty => "EMPTY_FILE",
                LoadError::Malformed { .. } | LoadError::Csv(_) => "MALFORMED_CSV",
                LoadError::Xlsx(_) | LoadError::NoWorksheet => "MALFORMED_XLSX",
                LoadError::Io(_) => "IO_ERROR",
            },
            PipelineError::Clean(CleanError::UnknownColumn(_)) => "UNKNOWN_COLUMN",
            PipelineError::Export(e) => match e {
                ExportError::TooLarge { .. } => "TABLE_TOO_LARGE",
                ExportError::Csv(_) | ExportError::Xlsx(_) => "EXPORT_FAILED",
            },
        }
    }

    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, PipelineError::Load(LoadError::UnsupportedFormat(_)))
    }
}

/// A pipeline error scoped to one uploaded file.
#[derive(Debug, Error)]
#[error("{file}: {error}", file = .file_id.name)]
pub struct FileFailure {
    pub file_id: FileId,
    #[source]
    pub error: PipelineError,
}

impl FileFailure {
    pub fn new(file_id: FileId, error: impl Into<PipelineError>) -> Self {
        Self {
            file_id,
            error: error.into(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The uploaded file could not be processed.
    #[error(transparent)]
    File(#[from] FileFailure),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::File(failure) => failure.error.code(),
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for exporting.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let load_err = LoadError::UnsupportedFormat(".txt".into());
        let pipeline_err: PipelineError = load_err.into();
        assert!(pipeline_err.to_string().contains(".txt"));
        assert!(pipeline_err.is_unsupported_format());
        assert_eq!(pipeline_err.code(), "UNSUPPORTED_FORMAT");

        let clean_err = CleanError::UnknownColumn("score".into());
        let pipeline_err: PipelineError = clean_err.into();
        assert!(pipeline_err.to_string().contains("score"));
        assert_eq!(pipeline_err.code(), "UNKNOWN_COLUMN");
    }

    #[test]
    fn test_file_failure_names_file() {
        let failure = FileFailure::new(
            FileId::new(0, "data.txt"),
            LoadError::UnsupportedFormat(".txt".into()),
        );
        let msg = failure.to_string();
        assert!(msg.contains("data.txt"));
        assert!(msg.contains("Unsupported file format: .txt"));
    }

    #[test]
    fn test_malformed_format() {
        let err = LoadError::Malformed {
            line: 3,
            expected: 2,
            found: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("Line 3"));
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("saw 4"));
    }

    #[test]
    fn test_server_error_code() {
        let err: ServerError = FileFailure::new(FileId::new(0, "a.csv"), LoadError::Empty).into();
        assert_eq!(err.code(), "EMPTY_FILE");
        assert!(err.to_string().starts_with("a.csv: "));
        assert_eq!(ServerError::BadRequest("x".into()).code(), "BAD_REQUEST");
    }
}
