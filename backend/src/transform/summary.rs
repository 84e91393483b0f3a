//! Read-only views of a table: numeric chart data and row previews.

use serde::Serialize;

use crate::models::{Cell, Column, ColumnKind, Table};

/// Most numeric columns a chart shows.
pub const MAX_CHART_COLUMNS: usize = 2;

/// Shown instead of a chart when a table has no numeric column.
pub const NO_NUMERIC_WARNING: &str = "No numerical data available for visualization.";

/// First numeric columns of `table` (at most two), or `None` if there are none.
pub fn numeric_preview(table: &Table) -> Option<Vec<&Column>> {
    let columns: Vec<&Column> = table
        .columns()
        .iter()
        .filter(|c| c.is_numeric())
        .take(MAX_CHART_COLUMNS)
        .collect();

    if columns.is_empty() {
        None
    } else {
        Some(columns)
    }
}

/// One charted column. Missing cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Bar-chart payload for the numeric preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    pub fn from_table(table: &Table) -> Option<Self> {
        let columns = numeric_preview(table)?;
        let series = columns
            .into_iter()
            .map(|c| ChartSeries {
                name: c.name.clone(),
                values: c.cells.iter().map(Cell::as_number).collect(),
            })
            .collect();
        Some(Self { series })
    }
}

/// Column header shown in a preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
}

/// First rows of a table, row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreview {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<Cell>>,
    pub total_rows: usize,
}

impl TablePreview {
    pub fn head(table: &Table, n: usize) -> Self {
        Self {
            columns: table
                .columns()
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.clone(),
                    kind: c.kind,
                    missing: c.missing_count(),
                })
                .collect(),
            rows: table
                .rows()
                .take(n)
                .map(|row| row.into_iter().cloned().collect())
                .collect(),
            total_rows: table.row_count(),
        }
    }

    /// Plain-text grid for terminals.
    pub fn render(&self) -> String {
        let headers: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                cells
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |values: &[String]| -> String {
            values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:<width$}", v, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = vec![line(&headers)];
        out.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        out.extend(cells.iter().map(|row| line(row)));
        out.join("\n")
    }
}
