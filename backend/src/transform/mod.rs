//! Transformation module.
//!
//! This module handles everything between loading and exporting:
//! - Cleaner: duplicate removal, numeric fill, column projection
//! - Summary: numeric chart data and row previews
//! - Pipeline: per-file and per-batch orchestration

pub mod cleaner;
pub mod pipeline;
pub mod summary;

pub use cleaner::{
    apply, fill_missing_numeric, project, remove_duplicates, CleaningReport, ColumnMean,
    FillReport,
};
pub use pipeline::*;
pub use summary::{numeric_preview, ChartData, ChartSeries, ColumnInfo, TablePreview};
