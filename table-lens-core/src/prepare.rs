use crate::audit::AuditReport;
use crate::profile::numeric::percentile;
use crate::table::{format_number, parse_number, Cell, Column, ColumnKind, Table};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use table_lens_common::TableLensError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStrategy {
    Mean,
    Median,
    Unknown,
    RemoveRows,
    KeepEmpty,
}

impl FillStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            FillStrategy::Mean => "Fill with Mean (Average)",
            FillStrategy::Median => "Fill with Median (Center)",
            FillStrategy::Unknown => "Fill with 'Unknown'",
            FillStrategy::RemoveRows => "Remove Rows",
            FillStrategy::KeepEmpty => "Keep Empty",
        }
    }
}

impl FromStr for FillStrategy {
    type Err = TableLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(FillStrategy::Mean),
            "median" => Ok(FillStrategy::Median),
            "unknown" => Ok(FillStrategy::Unknown),
            "remove" | "remove_rows" | "drop" => Ok(FillStrategy::RemoveRows),
            "keep" | "keep_empty" => Ok(FillStrategy::KeepEmpty),
            other => Err(TableLensError::Other(format!(
                "unknown fill strategy '{other}' (expected mean, median, unknown, remove or keep)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingSuggestion {
    pub column: String,
    pub count: usize,
    pub options: Vec<FillStrategy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSuggestion {
    pub column: String,
    pub numeric_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparationPlan {
    pub missing: Vec<MissingSuggestion>,
    pub conversions: Vec<ConversionSuggestion>,
    pub duplicate_rows: usize,
}

impl PreparationPlan {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.conversions.is_empty() && self.duplicate_rows == 0
    }
}

/// Read-only scan of the audited table for fixable issues.
pub fn suggest(report: &AuditReport) -> PreparationPlan {
    let missing = report
        .table
        .columns()
        .iter()
        .filter_map(|c| {
            let count = c.missing_count();
            if count == 0 {
                return None;
            }
            let options = if c.kind == ColumnKind::Numeric {
                vec![FillStrategy::Mean, FillStrategy::Median, FillStrategy::RemoveRows, FillStrategy::KeepEmpty]
            } else {
                vec![FillStrategy::Unknown, FillStrategy::RemoveRows, FillStrategy::KeepEmpty]
            };
            Some(MissingSuggestion {
                column: c.name.clone(),
                count,
                options,
            })
        })
        .collect();
    let conversions = report
        .kind_mismatches
        .iter()
        .map(|m| ConversionSuggestion {
            column: m.column.clone(),
            numeric_ratio: m.numeric_ratio,
        })
        .collect();
    PreparationPlan {
        missing,
        conversions,
        duplicate_rows: report.table.duplicate_row_count(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRequest {
    pub column: String,
    pub strategy: FillStrategy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreparationRequest {
    #[serde(default)]
    pub convert_types: Vec<String>,
    #[serde(default)]
    pub fill_missing: Vec<FillRequest>,
    #[serde(default)]
    pub remove_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedTable {
    pub table: Table,
    pub changes: Vec<String>,
}

/// Conversions first, then fills, then duplicate removal. The input is left untouched.
pub fn apply(input: &Table, request: &PreparationRequest) -> PreparedTable {
    let mut table = input.clone();
    let mut changes = Vec::new();

    for name in &request.convert_types {
        let Some(column) = table.column(name) else {
            changes.push(format!("Skipped conversion of '{name}': no such column"));
            continue;
        };
        let mut coerced = 0;
        let cells: Vec<Cell> = column
            .cells
            .iter()
            .map(|c| match c {
                Cell::Text(s) => match parse_number(s) {
                    Some(v) => Cell::Number(v),
                    None => {
                        coerced += 1;
                        Cell::Absent
                    }
                },
                other => other.clone(),
            })
            .collect();
        let change = if coerced > 0 {
            format!("Converted '{name}' to Number ({coerced} unparseable values became empty)")
        } else {
            format!("Converted '{name}' to Number")
        };
        replace(&mut table, Column::from_cells(name.clone(), cells), change, &mut changes);
    }

    for fill in &request.fill_missing {
        let name = &fill.column;
        let Some(column) = table.column(name) else {
            changes.push(format!("Skipped filling '{name}': no such column"));
            continue;
        };
        // counted after conversion, which may have added gaps
        let missing = column.missing_count();
        if missing == 0 {
            continue;
        }
        match fill.strategy {
            FillStrategy::Mean | FillStrategy::Median => {
                let mut values: Vec<f64> = column.numbers().collect();
                if column.kind != ColumnKind::Numeric || values.is_empty() {
                    changes.push(format!(
                        "Skipped {} for '{name}': column has no numeric values",
                        fill.strategy.label()
                    ));
                    continue;
                }
                let (value, change) = if fill.strategy == FillStrategy::Mean {
                    let mean = values.iter().sum::<f64>() / values.len() as f64;
                    (mean, format!("Filled {missing} missing in '{name}' with Mean ({mean:.2})"))
                } else {
                    values.sort_by(f64::total_cmp);
                    let median = percentile(&values, 0.5);
                    (median, format!("Filled {missing} missing in '{name}' with Median ({})", format_number(median)))
                };
                let filled = fill_absent(column, Cell::Number(value));
                replace(&mut table, filled, change, &mut changes);
            }
            FillStrategy::Unknown => {
                // a text fill turns the whole column into text
                let cells = column
                    .cells
                    .iter()
                    .map(|c| match c {
                        Cell::Absent => Cell::Text("Unknown".into()),
                        Cell::Number(v) => Cell::Text(format_number(*v)),
                        text => text.clone(),
                    })
                    .collect();
                let change = format!("Filled {missing} missing in '{name}' with 'Unknown'");
                replace(&mut table, Column::from_cells(name.clone(), cells), change, &mut changes);
            }
            FillStrategy::RemoveRows => {
                let keep: Vec<bool> = column.cells.iter().map(|c| !c.is_absent()).collect();
                table = table.retain_rows(&keep);
                changes.push(format!("Removed {missing} rows with missing '{name}'"));
            }
            FillStrategy::KeepEmpty => {}
        }
    }

    if request.remove_duplicates {
        let before = table.row_count();
        let keep: Vec<bool> = table.duplicate_flags().into_iter().map(|d| !d).collect();
        table = table.retain_rows(&keep);
        let removed = before - table.row_count();
        if removed > 0 {
            changes.push(format!("Removed {removed} duplicate rows"));
        }
    }

    tracing::debug!(changes = changes.len(), rows = table.row_count(), "preparation applied");
    PreparedTable { table, changes }
}

fn fill_absent(column: &Column, with: Cell) -> Column {
    let cells = column
        .cells
        .iter()
        .map(|c| if c.is_absent() { with.clone() } else { c.clone() })
        .collect();
    Column::from_cells(column.name.clone(), cells)
}

/// Swaps the column in and logs `change` only when the swap succeeded.
fn replace(table: &mut Table, column: Column, change: String, changes: &mut Vec<String>) {
    let name = column.name.clone();
    match table.replace_column(column) {
        Ok(()) => changes.push(change),
        Err(e) => {
            tracing::warn!(column = %name, error = %e, "column replacement rejected");
            changes.push(format!("Skipped change to '{name}': {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::audit;

    fn messy() -> Table {
        Table::new(vec![
            Column::numeric("n", vec![Some(1.0), None, Some(3.0), Some(1.0), Some(10.0)]),
            Column::text("code", vec![Some("1"), Some("2"), Some("x"), Some("1"), Some("5")]),
            Column::text("city", vec![Some("Oslo"), None, Some("Rome"), Some("Oslo"), Some("Lima")]),
        ])
        .unwrap()
    }

    #[test]
    fn suggestions_follow_column_kind() {
        let t = Table::new(vec![
            Column::numeric("n", vec![Some(1.0), None, Some(3.0), Some(3.0)]),
            Column::text("c", vec![Some("a"), Some("b"), None, Some("a")]),
        ])
        .unwrap();
        let plan = suggest(&audit(&t));
        assert_eq!(plan.missing.len(), 2);
        assert!(plan.missing[0].options.contains(&FillStrategy::Mean));
        assert!(!plan.missing[1].options.contains(&FillStrategy::Mean));
        assert_eq!(plan.duplicate_rows, 0);
    }

    #[test]
    fn conversion_suggested_for_mismatch() {
        let t = Table::new(vec![Column::text("v", vec![Some("1"), Some("2"), Some("3"), Some("4"), Some("5"), Some("?")])]).unwrap();
        let plan = suggest(&audit(&t));
        assert_eq!(plan.conversions.len(), 1);
        assert_eq!(plan.conversions[0].column, "v");
    }

    #[test]
    fn conversion_runs_before_fill() {
        let request = PreparationRequest {
            convert_types: vec!["code".into()],
            fill_missing: vec![FillRequest { column: "code".into(), strategy: FillStrategy::Median }],
            remove_duplicates: false,
        };
        let out = apply(&messy(), &request);
        let code = out.table.column("code").unwrap();
        assert_eq!(code.kind, ColumnKind::Numeric);
        // [1, 2, _, 1, 5] -> median of [1, 1, 2, 5] is 1.5
        assert_eq!(code.cells[2], Cell::Number(1.5));
        assert_eq!(out.changes.len(), 2);
        assert!(out.changes[0].contains("1 unparseable"));
        assert!(out.changes[1].contains("Median (1.5)"));
    }

    #[test]
    fn mean_and_unknown_fills() {
        let request = PreparationRequest {
            convert_types: vec![],
            fill_missing: vec![
                FillRequest { column: "n".into(), strategy: FillStrategy::Mean },
                FillRequest { column: "city".into(), strategy: FillStrategy::Unknown },
            ],
            remove_duplicates: false,
        };
        let out = apply(&messy(), &request);
        assert_eq!(out.table.column("n").unwrap().cells[1], Cell::Number(3.75));
        assert_eq!(out.table.column("city").unwrap().cells[1], Cell::Text("Unknown".into()));
        assert_eq!(out.table.missing_count(), 0);
    }

    #[test]
    fn mean_on_text_is_skipped() {
        let request = PreparationRequest {
            fill_missing: vec![FillRequest { column: "city".into(), strategy: FillStrategy::Mean }],
            ..Default::default()
        };
        let out = apply(&messy(), &request);
        assert_eq!(out.table, messy());
        assert!(out.changes[0].starts_with("Skipped"));
    }

    #[test]
    fn remove_rows_then_dedupe() {
        let request = PreparationRequest {
            convert_types: vec![],
            fill_missing: vec![FillRequest { column: "n".into(), strategy: FillStrategy::RemoveRows }],
            remove_duplicates: true,
        };
        let input = messy();
        let out = apply(&input, &request);
        assert_eq!(out.table.row_count(), 3);
        assert_eq!(out.changes, vec!["Removed 1 rows with missing 'n'", "Removed 1 duplicate rows"]);
        assert_eq!(input.row_count(), 5);
    }

    #[test]
    fn rejected_replacement_is_not_logged_as_done() {
        let mut table = messy();
        let mut changes = Vec::new();
        let short = Column::numeric("n", vec![Some(1.0)]);
        replace(&mut table, short, "Filled 1 missing in 'n' with Mean (1.00)".into(), &mut changes);
        assert_eq!(table, messy());
        assert_eq!(changes.len(), 1);
        assert!(changes[0].starts_with("Skipped change to 'n'"));

        let ok = fill_absent(table.column("n").unwrap(), Cell::Number(0.0));
        replace(&mut table, ok, "Filled 1 missing in 'n' with 0".into(), &mut changes);
        assert_eq!(changes[1], "Filled 1 missing in 'n' with 0");
        assert_eq!(table.column("n").unwrap().missing_count(), 0);
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("Median".parse::<FillStrategy>().unwrap(), FillStrategy::Median);
        assert_eq!("drop".parse::<FillStrategy>().unwrap(), FillStrategy::RemoveRows);
        assert!("average".parse::<FillStrategy>().is_err());
    }
}
