//! # Tabshift - upload, clean, preview and convert tabular files
//!
//! Tabshift loads CSV and XLSX uploads into an in-memory table, optionally
//! removes duplicate rows, fills missing numeric cells with the column mean
//! and keeps a subset of columns, then hands back a preview, chart data for
//! the first numeric columns, and the cleaned table as CSV or XLSX.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / XLSX │────▶│   Parser    │────▶│   Cleaner   │────▶│  Exporter   │
//! │   upload    │     │  (auto-enc) │     │ dedup/fill/ │     │ CSV / XLSX  │
//! └─────────────┘     └─────────────┘     │   project   │     └─────────────┘
//!                                         └──────┬──────┘
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │   Summary   │
//!                                         │ preview and │
//!                                         │ chart data  │
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tabshift::{process_file, CleaningOptions, ExportFormat, PipelineOptions, UploadedFile};
//!
//! let file = UploadedFile::new("scores.csv", "name,score\nAlice,10\nBob,\nAlice,10");
//! let options = PipelineOptions::default()
//!     .with_cleaning(CleaningOptions {
//!         remove_duplicates: true,
//!         fill_missing_numeric: true,
//!         keep_columns: None,
//!     })
//!     .with_export(ExportFormat::Csv);
//!
//! let report = process_file(&file, 0, &options).unwrap();
//! println!("{}", report.preview.render());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Table, cells, options and export artifacts
//! - [`parser`] - CSV/XLSX loading with encoding detection
//! - [`transform`] - Cleaning, summaries and the pipeline
//! - [`export`] - CSV/XLSX serialization
//! - [`config`] - Environment-driven settings
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Loading
pub mod parser;

// Cleaning and summaries
pub mod transform;

// Output
pub mod export;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CleanError, ConfigError, ExportError, FileFailure, LoadError, PipelineError, ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Cell, CleaningOptions, Column, ColumnKind, ColumnSelection, ExportArtifact, ExportFormat,
    FileId, Table, UploadedFile,
};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use parser::{
    decode_content, detect_encoding, extension_of, load, load_file, load_file_with, load_with,
    LoadOptions, SourceFormat,
};

// =============================================================================
// Re-exports - Cleaning and summaries
// =============================================================================

pub use transform::{
    apply as clean, fill_missing_numeric, numeric_preview, project, remove_duplicates, ChartData,
    CleaningReport, FillReport, TablePreview,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    process_batch, process_file, BatchReport, FileReport, PipelineOptions,
};

// =============================================================================
// Re-exports - Export and config
// =============================================================================

pub use config::AppConfig;
pub use export::{export, output_file_name};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ErrorBody, FileEntry, Status, UploadResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
