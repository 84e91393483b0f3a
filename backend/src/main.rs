//! Tabshift CLI - Clean, preview and convert CSV/XLSX files
//!
//! # Commands
//!
//! ```bash
//! tabshift serve                          # Start HTTP server (port 3000)
//! tabshift inspect data.csv report.xlsx   # Preview files and their chart columns
//! tabshift convert data.csv --to xlsx     # Write data.xlsx next to the input
//! ```
//!
//! Cleaning flags (`--dedup`, `--fill`, `--keep a,b`) work with both
//! `inspect` and `convert`. Settings come from `TABSHIFT_*` environment
//! variables (or a `.env` file) and are overridden by flags.

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tabshift::{
    process_batch, process_file, AppConfig, CleaningOptions, ExportFormat, FileFailure, FileId,
    FileReport, LoadError, PipelineOptions, UploadedFile,
};

#[derive(Parser)]
#[command(name = "tabshift")]
#[command(about = "Clean, preview and convert CSV/XLSX files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load files, clean them and print a preview of each
    Inspect {
        /// Input CSV/XLSX files, processed in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        cleaning: CleaningArgs,

        /// Number of preview rows (default: TABSHIFT_PREVIEW_ROWS or 5)
        #[arg(long)]
        rows: Option<usize>,
    },

    /// Clean a file and write it as CSV or XLSX
    Convert {
        /// Input CSV/XLSX file
        input: PathBuf,

        /// Target format: csv or xlsx
        #[arg(long)]
        to: ExportFormat,

        #[command(flatten)]
        cleaning: CleaningArgs,

        /// Output file (default: input name with the new extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: TABSHIFT_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct CleaningArgs {
    /// Remove duplicate rows
    #[arg(long)]
    dedup: bool,

    /// Fill missing numeric values with the column mean
    #[arg(long)]
    fill: bool,

    /// Columns to keep, comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    keep: Option<Vec<String>>,
}

impl From<CleaningArgs> for CleaningOptions {
    fn from(args: CleaningArgs) -> Self {
        CleaningOptions {
            remove_duplicates: args.dedup,
            fill_missing_numeric: args.fill,
            keep_columns: args.keep,
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect {
            files,
            cleaning,
            rows,
        } => cmd_inspect(&files, cleaning.into(), rows),

        Commands::Convert {
            input,
            to,
            cleaning,
            output,
        } => cmd_convert(&input, to, cleaning.into(), output.as_deref()),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_inspect(
    paths: &[PathBuf],
    cleaning: CleaningOptions,
    rows: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(rows) = rows {
        config.preview_rows = rows;
    }
    let options = PipelineOptions::from_config(&config).with_cleaning(cleaning);

    let mut uploads = Vec::with_capacity(paths.len());
    let mut failed = 0;
    for (index, path) in paths.iter().enumerate() {
        match read_upload(path, index) {
            Ok(file) => uploads.push(file),
            Err(failure) => {
                failed += 1;
                eprintln!("❌ {}", failure);
            }
        }
    }

    // Pipeline logs stream to stdout while the batch runs; reports follow it
    let batch = process_batch(&uploads, &options);
    failed += batch.failed();

    for result in &batch.files {
        match result {
            Ok(report) => print_report(report),
            Err(failure) => eprintln!("\n❌ {}", failure),
        }
    }

    eprintln!(
        "\n📊 Results: {} processed, {} failed",
        paths.len() - failed,
        failed
    );

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_convert(
    input: &Path,
    format: ExportFormat,
    cleaning: CleaningOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let options = PipelineOptions::from_config(&config)
        .with_cleaning(cleaning)
        .with_export(format);

    eprintln!("🔄 Converting: {} → {}", input.display(), format);

    let file = read_upload(input, 0)?;
    let report = process_file(&file, 0, &options)?;
    let artifact = report
        .export
        .ok_or("export produced no output")?;

    let target = match output {
        Some(p) => p.to_path_buf(),
        None => {
            let derived = input.with_file_name(&artifact.file_name);
            if derived == input {
                return Err(format!(
                    "{} is already {}; pass -o to choose an output file",
                    input.display(),
                    format
                )
                .into());
            }
            derived
        }
    };

    fs::write(&target, &artifact.bytes)?;
    eprintln!("   Rows: {}", report.preview.total_rows);
    eprintln!("   Type: {}", artifact.mime_type);
    eprintln!("💾 Output written to: {}", target.display());
    eprintln!("\n✨ Done!");

    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    tabshift::server::start_server(config).await
}

/// Read a file from disk as an upload named after its file name.
fn read_upload(path: &Path, index: usize) -> Result<UploadedFile, FileFailure> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match fs::read(path) {
        Ok(bytes) => Ok(UploadedFile::new(name, bytes)),
        Err(e) => Err(FileFailure::new(FileId::new(index, name), LoadError::Io(e))),
    }
}

fn print_report(report: &FileReport) {
    let preview = &report.preview;

    println!("\n📄 {}", report.file_id.name);
    println!(
        "   Rows: {} → {}",
        report.original_rows, preview.total_rows
    );
    println!(
        "   Columns: {} → {}",
        report.original_columns,
        preview.columns.len()
    );
    for column in &preview.columns {
        println!(
            "     - {} ({}, {} missing)",
            column.name, column.kind, column.missing
        );
    }

    let cleaning = &report.cleaning;
    if let Some(removed) = cleaning.duplicates_removed {
        println!("   🧹 Duplicates removed: {}", removed);
    }
    if let Some(ref fill) = cleaning.fill {
        println!("   🧹 Cells filled: {}", fill.cells_filled);
        if !fill.unfilled_columns.is_empty() {
            println!("   ⚠️  Left unfilled: {}", fill.unfilled_columns.join(", "));
        }
    }
    if let Some(ref dropped) = cleaning.columns_dropped {
        if !dropped.is_empty() {
            println!("   🧹 Columns dropped: {}", dropped.join(", "));
        }
    }

    println!("\n{}\n", preview.render());
    if preview.total_rows > preview.rows.len() {
        println!("... {} more rows", preview.total_rows - preview.rows.len());
    }

    match (&report.chart, &report.chart_warning) {
        (Some(chart), _) => {
            let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
            println!("📈 Chart columns: {}", names.join(", "));
        }
        (None, Some(warning)) => println!("⚠️  {}", warning),
        (None, None) => {}
    }
}
