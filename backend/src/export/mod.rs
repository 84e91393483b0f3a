//! Exporter: serialize a [`Table`] to CSV or XLSX bytes.
//!
//! The output file name is derived from the uploaded one by swapping its
//! extension, and the MIME type comes from the target format. The table is
//! only read.

use rust_xlsxwriter::{Format, Workbook};

use crate::error::{ExportError, ExportResult};
use crate::models::{format_number, Cell, ExportArtifact, ExportFormat, Table};
use crate::parser::extension_of;

/// Worksheet row limit, header included.
pub const XLSX_MAX_ROWS: usize = 1_048_576;

/// Worksheet column limit.
pub const XLSX_MAX_COLUMNS: usize = 16_384;

/// Name of the single exported worksheet.
pub const SHEET_NAME: &str = "Sheet1";

/// Serialize `table` as `format`, naming the result after `original_file_name`.
pub fn export(
    table: &Table,
    format: ExportFormat,
    original_file_name: &str,
) -> ExportResult<ExportArtifact> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(table)?,
        ExportFormat::Xlsx => to_xlsx(table)?,
    };

    Ok(ExportArtifact {
        bytes,
        file_name: output_file_name(original_file_name, format),
        mime_type: format.mime_type(),
    })
}

/// Replace the last extension of `original` with the format's extension.
pub fn output_file_name(original: &str, format: ExportFormat) -> String {
    let stem = match original.rfind('.') {
        Some(dot) if !extension_of(original).is_empty() => &original[..dot],
        _ => original,
    };
    format!("{}{}", stem, format.extension())
}

/// CSV with a header row and no index column.
pub fn to_csv(table: &Table) -> ExportResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if table.column_count() > 0 {
        writer.write_record(table.columns().iter().map(|c| c.name.as_str()))?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
    } else {
        // No columns: one empty line per row after the empty header
        let mut out = b"\n".to_vec();
        out.extend(std::iter::repeat(b'\n').take(table.row_count()));
        return Ok(out);
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.error().to_string()))
}

/// Single-sheet workbook with a bold header row and no index column.
pub fn to_xlsx(table: &Table) -> ExportResult<Vec<u8>> {
    if table.row_count() + 1 > XLSX_MAX_ROWS || table.column_count() > XLSX_MAX_COLUMNS {
        return Err(ExportError::TooLarge {
            rows: table.row_count(),
            columns: table.column_count(),
        });
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, column) in table.columns().iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, &column.name, &header_format)?;

        for (row, cell) in column.cells.iter().enumerate() {
            let row = row as u32 + 1;
            match cell {
                Cell::Missing => {}
                Cell::Number(n) if n.is_finite() => {
                    sheet.write_number(row, col, *n)?;
                }
                Cell::Number(n) => {
                    sheet.write_string(row, col, format_number(*n))?;
                }
                Cell::Text(s) => {
                    sheet.write_string(row, col, s)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnKind, ColumnSelection, CSV_MIME, XLSX_MIME};
    use crate::parser::load;
    use crate::transform::cleaner::project;

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("report.xlsx", ExportFormat::Csv), "report.csv");
        assert_eq!(output_file_name("data.csv", ExportFormat::Xlsx), "data.xlsx");
        assert_eq!(output_file_name("Q1.Report.XLSX", ExportFormat::Csv), "Q1.Report.csv");
        assert_eq!(output_file_name("csv.csv", ExportFormat::Xlsx), "csv.xlsx");
        assert_eq!(output_file_name("noext", ExportFormat::Csv), "noext.csv");
    }

    #[test]
    fn test_csv_export() {
        let table = load(b"name,score\nAlice,10\nBob,\n\"Smith, J\",2.5", ".csv").unwrap();
        let artifact = export(&table, ExportFormat::Csv, "scores.xlsx").unwrap();

        assert_eq!(artifact.file_name, "scores.csv");
        assert_eq!(artifact.mime_type, CSV_MIME);
        assert_eq!(
            String::from_utf8(artifact.bytes).unwrap(),
            "name,score\nAlice,10\nBob,\n\"Smith, J\",2.5\n"
        );
    }

    #[test]
    fn test_csv_round_trip() {
        let source = "id,label,value\n1,a,0.5\n2,,\n3,\"x,y\",-4\n";
        let table = load(source.as_bytes(), ".csv").unwrap();
        let bytes = to_csv(&table).unwrap();
        let reloaded = load(&bytes, ".csv").unwrap();

        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_csv_round_trip_single_column_with_missing() {
        let mut table = load(b"name,score\nAlice,10\nBob,\nCara,3", ".csv").unwrap();
        let selection = ColumnSelection::from_names(&table, &["score"]).unwrap();
        project(&mut table, &selection);

        let bytes = to_csv(&table).unwrap();
        assert_eq!(bytes, b"score\n10\n\"\"\n3\n");

        let reloaded = load(&bytes, ".csv").unwrap();
        assert_eq!(reloaded.row_count(), 3);
        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_export_does_not_mutate() {
        let table = load(b"a\n1\n1", ".csv").unwrap();
        let before = table.clone();
        export(&table, ExportFormat::Xlsx, "a.csv").unwrap();
        export(&table, ExportFormat::Csv, "a.csv").unwrap();
        assert_eq!(table, before);
    }

    #[test]
    fn test_xlsx_export_round_trip() {
        let table = load(b"name,score\nAlice,10\nBob,\nCara,2.5", ".csv").unwrap();
        let artifact = export(&table, ExportFormat::Xlsx, "scores.csv").unwrap();

        assert_eq!(artifact.file_name, "scores.xlsx");
        assert_eq!(artifact.mime_type, XLSX_MIME);
        // XLSX is a zip archive
        assert_eq!(&artifact.bytes[..2], b"PK");

        let reloaded = load(&artifact.bytes, ".xlsx").unwrap();
        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_xlsx_round_trip_keeps_blank_rows() {
        let table = load(b"a,b\n1,2\n,\n3,4", ".csv").unwrap();
        let reloaded = load(&to_xlsx(&table).unwrap(), ".xlsx").unwrap();

        assert_eq!(reloaded.row_count(), 3);
        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_xlsx_trailing_blank_rows_are_lost() {
        let table = load(b"a,b\n1,2\n,", ".csv").unwrap();
        assert_eq!(table.row_count(), 2);

        let reloaded = load(&to_xlsx(&table).unwrap(), ".xlsx").unwrap();
        assert_eq!(reloaded.row_count(), 1);
        assert_eq!(reloaded.column("a").unwrap().cells, vec![Cell::Number(1.0)]);
    }

    #[test]
    fn test_xlsx_infinite_written_as_text() {
        let table = Table::new(vec![Column::new(
            "v",
            ColumnKind::Numeric,
            vec![Cell::Number(f64::INFINITY), Cell::Number(1.0)],
        )]);
        let bytes = to_xlsx(&table).unwrap();
        let reloaded = load(&bytes, ".xlsx").unwrap();
        // "inf" parses back as a number
        assert_eq!(
            reloaded.column("v").unwrap().cells,
            vec![Cell::Number(f64::INFINITY), Cell::Number(1.0)]
        );
    }

    #[test]
    fn test_zero_column_csv() {
        let mut table = load(b"a\n1\n2", ".csv").unwrap();
        let none: [&str; 0] = [];
        let selection = ColumnSelection::from_names(&table, &none).unwrap();
        project(&mut table, &selection);
        assert_eq!(table.row_count(), 2);
        assert_eq!(to_csv(&table).unwrap(), b"\n\n\n");
    }
}
