//! Cleaning operations.
//!
//! Three independent, idempotent operations that mutate a [`Table`] in place:
//!
//! - [`remove_duplicates`] - drop rows equal to an earlier row
//! - [`fill_missing_numeric`] - replace missing numeric cells with the column mean
//! - [`project`] - keep a [`ColumnSelection`] of columns
//!
//! [`apply`] runs the enabled ones in that order, so duplicate detection and
//! means always see every original column.

use serde::Serialize;
use std::collections::HashSet;

use crate::error::CleanError;
use crate::models::{Cell, CleaningOptions, ColumnSelection, Table};

/// What [`fill_missing_numeric`] did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillReport {
    /// Number of cells replaced.
    pub cells_filled: usize,
    /// Mean used per column that had missing cells.
    pub means: Vec<ColumnMean>,
    /// Numeric columns left unfilled because they hold no value at all.
    pub unfilled_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMean {
    pub column: String,
    pub mean: f64,
    pub filled: usize,
}

/// What [`apply`] did. `None` fields were not requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningReport {
    pub duplicates_removed: Option<usize>,
    pub fill: Option<FillReport>,
    pub columns_dropped: Option<Vec<String>>,
}

/// Delete rows that repeat an earlier row (all columns compared).
///
/// Keeps the first occurrence and the relative order of kept rows.
/// Returns the number of rows removed.
pub fn remove_duplicates(table: &mut Table) -> usize {
    let before = table.row_count();
    let mut seen: HashSet<Vec<&Cell>> = HashSet::with_capacity(before);
    let keep: Vec<bool> = table.rows().map(|row| seen.insert(row)).collect();
    drop(seen);

    let removed = keep.iter().filter(|k| !**k).count();
    if removed > 0 {
        table.retain_rows(&keep);
    }
    removed
}

/// Replace missing cells of numeric columns with the column mean.
///
/// The mean is taken over non-missing cells before any replacement. Text
/// columns are not touched; numeric columns without a single value stay
/// as they are.
pub fn fill_missing_numeric(table: &mut Table) -> FillReport {
    let mut report = FillReport::default();

    for column in table.columns_mut().iter_mut().filter(|c| c.is_numeric()) {
        let missing = column.missing_count();
        if missing == 0 {
            continue;
        }

        let values: Vec<f64> = column.cells.iter().filter_map(Cell::as_number).collect();
        if values.is_empty() {
            report.unfilled_columns.push(column.name.clone());
            continue;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        for cell in column.cells.iter_mut().filter(|c| c.is_missing()) {
            *cell = Cell::Number(mean);
        }

        report.cells_filled += missing;
        report.means.push(ColumnMean {
            column: column.name.clone(),
            mean,
            filled: missing,
        });
    }

    report
}

/// Keep only the selected columns, in the table's order.
///
/// Returns the names of dropped columns. Row count is unchanged, even when
/// nothing is selected.
pub fn project(table: &mut Table, selection: &ColumnSelection) -> Vec<String> {
    let dropped: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| !selection.contains(&c.name))
        .map(|c| c.name.clone())
        .collect();

    if !dropped.is_empty() {
        table.retain_columns(|c| selection.contains(&c.name));
    }
    dropped
}

/// Run the operations enabled in `options`: duplicates, fill, projection.
pub fn apply(table: &mut Table, options: &CleaningOptions) -> Result<CleaningReport, CleanError> {
    // Resolve the selection first so a bad name leaves the table untouched
    let selection = options
        .keep_columns
        .as_ref()
        .map(|names| ColumnSelection::from_names(table, names))
        .transpose()?;

    let mut report = CleaningReport::default();

    if options.remove_duplicates {
        report.duplicates_removed = Some(remove_duplicates(table));
    }
    if options.fill_missing_numeric {
        report.fill = Some(fill_missing_numeric(table));
    }
    if let Some(selection) = selection {
        report.columns_dropped = Some(project(table, &selection));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnKind};
    use crate::parser::load;

    fn scores() -> Table {
        load(b"name,score\nAlice,10\nBob,\nAlice,10", ".csv").unwrap()
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        let mut table = load(b"a,b\n1,x\n2,y\n1,x\n3,z\n2,y", ".csv").unwrap();
        let removed = remove_duplicates(&mut table);

        assert_eq!(removed, 2);
        assert_eq!(table.row_count(), 3);
        assert_eq!(
            table.column("a").unwrap().cells,
            vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)]
        );
    }

    #[test]
    fn test_remove_duplicates_compares_all_columns() {
        let mut table = load(b"a,b\n1,x\n1,y", ".csv").unwrap();
        assert_eq!(remove_duplicates(&mut table), 0);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_remove_duplicates_missing_equal() {
        let mut table = load(b"a,b\n1,\n1,", ".csv").unwrap();
        assert_eq!(remove_duplicates(&mut table), 1);
    }

    #[test]
    fn test_remove_duplicates_idempotent() {
        let mut once = load(b"a\n1\n1\n2\n2\n1", ".csv").unwrap();
        remove_duplicates(&mut once);
        let mut twice = once.clone();
        assert_eq!(remove_duplicates(&mut twice), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fill_uses_mean_before_replacement() {
        let mut table = load(b"v,t\n1,a\n,b\n3,\n,d", ".csv").unwrap();
        let report = fill_missing_numeric(&mut table);

        assert_eq!(report.cells_filled, 2);
        assert_eq!(report.means[0].mean, 2.0);
        assert_eq!(
            table.column("v").unwrap().cells,
            vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0), Cell::Number(2.0)]
        );
        // Text column keeps its gap
        assert_eq!(table.column("t").unwrap().cells[2], Cell::Missing);
    }

    #[test]
    fn test_fill_leaves_all_missing_column() {
        let mut table = load(b"a,b\nx,\ny,", ".csv").unwrap();
        let report = fill_missing_numeric(&mut table);

        assert_eq!(report.cells_filled, 0);
        assert_eq!(report.unfilled_columns, vec!["b".to_string()]);
        assert_eq!(table.column("b").unwrap().missing_count(), 2);

        // Second pass changes nothing either
        let before = table.clone();
        let again = fill_missing_numeric(&mut table);
        assert_eq!(again.cells_filled, 0);
        assert_eq!(table, before);
    }

    #[test]
    fn test_fill_idempotent() {
        let mut table = load(b"v,t\n1,a\n,b\n5,c", ".csv").unwrap();
        let first = fill_missing_numeric(&mut table);
        assert_eq!(first.cells_filled, 1);
        assert_eq!(table.column("v").unwrap().cells[1], Cell::Number(3.0));

        let once = table.clone();
        let report = fill_missing_numeric(&mut table);
        assert_eq!(report, FillReport::default());
        assert_eq!(table, once);
    }

    #[test]
    fn test_project_keeps_table_order() {
        let mut table = load(b"a,b,c\n1,2,3", ".csv").unwrap();
        let selection = ColumnSelection::from_names(&table, &["c", "a"]).unwrap();
        let dropped = project(&mut table, &selection);

        assert_eq!(dropped, vec!["b".to_string()]);
        assert_eq!(table.column_names(), vec!["a", "c"]);
    }

    #[test]
    fn test_project_identity() {
        let mut table = load(b"a,b\n1,x\n2,y", ".csv").unwrap();
        let original = table.clone();
        let selection = ColumnSelection::all(&table);
        assert!(project(&mut table, &selection).is_empty());
        assert_eq!(table, original);
    }

    #[test]
    fn test_project_nothing_keeps_rows() {
        let mut table = load(b"a,b\n1,x\n2,y\n3,z", ".csv").unwrap();
        let selection = ColumnSelection::from_names::<&str>(&table, &[]).unwrap();
        project(&mut table, &selection);

        assert_eq!(table.column_count(), 0);
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_scenario_dedup_then_fill() {
        let mut table = scores();
        let options = CleaningOptions {
            remove_duplicates: true,
            fill_missing_numeric: true,
            keep_columns: None,
        };
        let report = apply(&mut table, &options).unwrap();

        assert_eq!(report.duplicates_removed, Some(1));
        assert_eq!(report.fill.as_ref().unwrap().cells_filled, 1);
        assert_eq!(
            table.column("name").unwrap().cells,
            vec![Cell::Text("Alice".into()), Cell::Text("Bob".into())]
        );
        assert_eq!(
            table.column("score").unwrap().cells,
            vec![Cell::Number(10.0), Cell::Number(10.0)]
        );
    }

    #[test]
    fn test_apply_selection_after_cleaning() {
        // Rows only differ in the dropped column, so dedup must see it
        let mut table = load(b"id,v\n1,5\n2,5", ".csv").unwrap();
        let options = CleaningOptions {
            remove_duplicates: true,
            fill_missing_numeric: false,
            keep_columns: Some(vec!["v".into()]),
        };
        let report = apply(&mut table, &options).unwrap();

        assert_eq!(report.duplicates_removed, Some(0));
        assert_eq!(report.columns_dropped, Some(vec!["id".to_string()]));
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_apply_unknown_column_leaves_table() {
        let mut table = scores();
        let original = table.clone();
        let options = CleaningOptions {
            remove_duplicates: true,
            fill_missing_numeric: false,
            keep_columns: Some(vec!["missing".into()]),
        };

        assert!(matches!(
            apply(&mut table, &options),
            Err(CleanError::UnknownColumn(name)) if name == "missing"
        ));
        assert_eq!(table, original);
    }

    #[test]
    fn test_apply_nothing_requested() {
        let mut table = scores();
        let original = table.clone();
        let report = apply(&mut table, &CleaningOptions::default()).unwrap();
        assert_eq!(report, CleaningReport::default());
        assert_eq!(table, original);
    }

    #[test]
    fn test_fill_ignores_numbers_in_text_column() {
        let mut table = Table::new(vec![Column::new(
            "mixed",
            ColumnKind::Text,
            vec![Cell::Number(1.0), Cell::Missing],
        )]);
        assert_eq!(fill_missing_numeric(&mut table).cells_filled, 0);
    }
}
