//! High-level pipeline API: load, clean, summarize and optionally export.
//!
//! Each uploaded file is processed on its own. A batch runs files in upload
//! order and a failing file never stops the ones after it.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabshift::{process_batch, PipelineOptions, UploadedFile};
//!
//! let files = vec![
//!     UploadedFile::new("scores.csv", "name,score\nAlice,10\nBob,\nAlice,10"),
//!     UploadedFile::new("notes.txt", "hello"),
//! ];
//! let report = process_batch(&files, &PipelineOptions::default());
//!
//! assert_eq!(report.succeeded(), 1);
//! assert_eq!(report.failed(), 1);
//! ```

use serde::Serialize;

use super::cleaner::{apply, CleaningReport};
use super::summary::{ChartData, TablePreview, NO_NUMERIC_WARNING};
use crate::api::logs::{
    log_error, log_info, log_info_indent, log_success, log_success_indent, log_warning,
};
use crate::config::{AppConfig, DEFAULT_PREVIEW_ROWS};
use crate::error::{FileFailure, PipelineResult};
use crate::export::export;
use crate::models::{CleaningOptions, ExportArtifact, ExportFormat, FileId, Table, UploadedFile};
use crate::parser::{extension_of, load_with, LoadOptions};

/// Options shared by every file of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Cleaning operations to run.
    pub cleaning: CleaningOptions,
    /// Export target, if the caller wants the converted bytes.
    pub export: Option<ExportFormat>,
    /// Rows kept in the preview.
    pub preview_rows: usize,
    /// Loader settings.
    pub load: LoadOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cleaning: CleaningOptions::default(),
            export: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            load: LoadOptions::default(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            preview_rows: config.preview_rows,
            load: LoadOptions {
                max_bytes: config.max_upload_bytes,
            },
            ..Self::default()
        }
    }

    pub fn with_cleaning(mut self, cleaning: CleaningOptions) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn with_export(mut self, format: ExportFormat) -> Self {
        self.export = Some(format);
        self
    }
}

/// Outcome of one successfully processed file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_id: FileId,
    /// Rows before cleaning.
    pub original_rows: usize,
    /// Columns before cleaning.
    pub original_columns: usize,
    pub cleaning: CleaningReport,
    pub preview: TablePreview,
    /// `None` when the table has no numeric column; see `chart_warning`.
    pub chart: Option<ChartData>,
    pub chart_warning: Option<String>,
    #[serde(skip)]
    pub export: Option<ExportArtifact>,
}

/// Run one file through the whole pipeline.
pub fn process_file(
    file: &UploadedFile,
    index: usize,
    options: &PipelineOptions,
) -> Result<FileReport, FileFailure> {
    let file_id = FileId::new(index, &file.name);
    match run(file, &file_id, options) {
        Ok(report) => Ok(report),
        Err(error) => Err(FileFailure::new(file_id, error)),
    }
}

fn run(
    file: &UploadedFile,
    file_id: &FileId,
    options: &PipelineOptions,
) -> PipelineResult<FileReport> {
    // Step 1: Load
    let extension = extension_of(&file.name);
    log_info(format!("📖 Reading {} ({} bytes)...", file.name, file.bytes.len()));
    let mut table = load_with(&file.bytes, &extension, &options.load)?;
    let original_rows = table.row_count();
    let original_columns = table.column_count();
    log_success(format!(
        "Read {} rows x {} columns",
        original_rows, original_columns
    ));
    for column in table.columns() {
        log_info_indent(format!("{} ({})", column.name, column.kind), 1);
    }

    // Step 2: Clean
    let cleaning = apply(&mut table, &options.cleaning)?;
    print_cleaning_report(&cleaning);

    // Step 3: Summarize
    let chart = ChartData::from_table(&table);
    let chart_warning = chart.is_none().then(|| NO_NUMERIC_WARNING.to_string());
    if chart_warning.is_some() {
        log_warning(NO_NUMERIC_WARNING);
    }

    // Step 4: Export
    let export = match options.export {
        Some(format) => Some(export_table(&table, format, &file.name)?),
        None => None,
    };

    Ok(FileReport {
        file_id: file_id.clone(),
        original_rows,
        original_columns,
        cleaning,
        preview: TablePreview::head(&table, options.preview_rows),
        chart,
        chart_warning,
        export,
    })
}

fn export_table(
    table: &Table,
    format: ExportFormat,
    file_name: &str,
) -> PipelineResult<ExportArtifact> {
    log_info(format!("🔄 Converting to {}...", format));
    let artifact = export(table, format, file_name)?;
    log_success(format!(
        "{} ready ({} bytes)",
        artifact.file_name,
        artifact.bytes.len()
    ));
    Ok(artifact)
}

fn print_cleaning_report(report: &CleaningReport) {
    if let Some(removed) = report.duplicates_removed {
        log_success(format!("Duplicates removed! ({} rows)", removed));
    }
    if let Some(ref fill) = report.fill {
        log_success(format!("Missing values filled! ({} cells)", fill.cells_filled));
        for mean in &fill.means {
            log_success_indent(format!("{} ← mean {}", mean.column, mean.mean), 1);
        }
        for column in &fill.unfilled_columns {
            log_warning(format!("{} has no values, left unfilled", column));
        }
    }
    if let Some(ref dropped) = report.columns_dropped {
        if !dropped.is_empty() {
            log_info(format!("Dropped columns: {}", dropped.join(", ")));
        }
    }
}

/// Results of a batch, in upload order.
#[derive(Debug)]
pub struct BatchReport {
    pub files: Vec<Result<FileReport, FileFailure>>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|r| r.is_err()).count()
    }

    pub fn reports(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileFailure> {
        self.files.iter().filter_map(|r| r.as_ref().err())
    }
}

/// Process `files` in order; failures are recorded and skipped.
pub fn process_batch(files: &[UploadedFile], options: &PipelineOptions) -> BatchReport {
    let mut results = Vec::with_capacity(files.len());

    for (index, file) in files.iter().enumerate() {
        log_info(format!("📄 [{}/{}] {}", index + 1, files.len(), file.name));
        let result = process_file(file, index, options);
        if let Err(ref failure) = result {
            log_error(failure.to_string());
        }
        results.push(result);
    }

    let report = BatchReport { files: results };
    if report.failed() == 0 {
        log_success(format!("🎉 All {} files processed successfully!", report.succeeded()));
    } else {
        log_warning(format!(
            "{} of {} files failed",
            report.failed(),
            report.files.len()
        ));
    }
    report
}
