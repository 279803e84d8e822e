use crate::table::{parse_number, Cell, ColumnKind, Table};
use serde::{Deserialize, Serialize};
use table_lens_common::{AuditConfig, Result, TableLensError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    NothingToClean,
    RemoveEmptyRows,
    RemoveEmptyColumns,
    FlagKindMismatch,
}

/// What a step touched, positions relative to the table the step was applied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "items", rename_all = "snake_case")]
pub enum StepSubject {
    None,
    Rows(Vec<usize>),
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditStep {
    pub action: AuditAction,
    pub count: usize,
    pub before: usize,
    pub after: usize,
    pub reason: String,
    pub subject: StepSubject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub row_count: usize,
    pub column_count: usize,
    pub total_cells: usize,
    pub missing_cells: usize,
    pub rows_with_missing: usize,
    pub columns_with_missing: usize,
    pub duplicate_rows: usize,
}

impl TableStats {
    pub fn of(table: &Table) -> Self {
        Self {
            row_count: table.row_count(),
            column_count: table.column_count(),
            total_cells: table.total_cells(),
            missing_cells: table.missing_count(),
            rows_with_missing: table.rows_with_missing(),
            columns_with_missing: table.columns_with_missing(),
            duplicate_rows: table.duplicate_row_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindMismatch {
    pub column: String,
    pub declared: ColumnKind,
    pub inferred: ColumnKind,
    pub numeric_cells: usize,
    pub present_cells: usize,
    pub numeric_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    #[serde(skip)]
    pub table: Table,
    pub steps: Vec<AuditStep>,
    pub raw_stats: TableStats,
    pub audited_stats: TableStats,
    pub kind_mismatches: Vec<KindMismatch>,
    /// Zero rows or zero columns remain; downstream results are minimal.
    pub empty_input: bool,
}

impl AuditReport {
    pub fn rows_removed(&self) -> usize {
        self.raw_stats.row_count - self.audited_stats.row_count
    }

    pub fn columns_removed(&self) -> usize {
        self.raw_stats.column_count - self.audited_stats.column_count
    }

    pub fn empty_input_error(&self) -> Option<TableLensError> {
        self.empty_input.then(|| TableLensError::EmptyInput {
            rows: self.audited_stats.row_count,
            columns: self.audited_stats.column_count,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Auditor {
    config: AuditConfig,
}

impl Auditor {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    pub fn audit(&self, original: &Table) -> AuditReport {
        let raw_stats = TableStats::of(original);
        if original.is_empty() {
            tracing::warn!(rows = raw_stats.row_count, columns = raw_stats.column_count, "empty table");
            let step = AuditStep {
                action: AuditAction::NothingToClean,
                count: 0,
                before: raw_stats.row_count,
                after: raw_stats.row_count,
                reason: format!(
                    "table has {} rows and {} columns; nothing to clean",
                    raw_stats.row_count, raw_stats.column_count
                ),
                subject: StepSubject::None,
            };
            return AuditReport {
                table: original.clone(),
                steps: vec![step],
                audited_stats: raw_stats.clone(),
                raw_stats,
                kind_mismatches: Vec::new(),
                empty_input: true,
            };
        }

        let mut table = original.clone();
        let mut steps = Vec::new();

        let empty_rows: Vec<usize> = (0..table.row_count()).filter(|&r| table.is_row_empty(r)).collect();
        if !empty_rows.is_empty() {
            let before = table.row_count();
            table = table.without_rows(&empty_rows);
            steps.push(AuditStep {
                action: AuditAction::RemoveEmptyRows,
                count: empty_rows.len(),
                before,
                after: table.row_count(),
                reason: format!("removed {} rows where every cell was empty", empty_rows.len()),
                subject: StepSubject::Rows(empty_rows),
            });
        }

        let empty_columns: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| c.is_all_absent())
            .map(|c| c.name.clone())
            .collect();
        if !empty_columns.is_empty() {
            let before = table.column_count();
            table = table.without_columns(&empty_columns);
            steps.push(AuditStep {
                action: AuditAction::RemoveEmptyColumns,
                count: empty_columns.len(),
                before,
                after: table.column_count(),
                reason: format!(
                    "removed {} columns with no values: {}",
                    empty_columns.len(),
                    empty_columns.join(", ")
                ),
                subject: StepSubject::Columns(empty_columns),
            });
        }

        let kind_mismatches = self.detect_kind_mismatches(&table);
        for m in &kind_mismatches {
            steps.push(AuditStep {
                action: AuditAction::FlagKindMismatch,
                count: m.numeric_cells,
                before: table.row_count(),
                after: table.row_count(),
                reason: format!(
                    "column '{}' is declared text but {:.1}% of its {} values parse as numbers (inferred numeric); left unchanged",
                    m.column,
                    m.numeric_ratio * 100.0,
                    m.present_cells
                ),
                subject: StepSubject::Columns(vec![m.column.clone()]),
            });
        }

        if steps.is_empty() {
            steps.push(AuditStep {
                action: AuditAction::NothingToClean,
                count: 0,
                before: table.row_count(),
                after: table.row_count(),
                reason: "no empty rows, empty columns or mistyped columns found; nothing to clean".into(),
                subject: StepSubject::None,
            });
        }

        let audited_stats = TableStats::of(&table);
        let empty_input = table.is_empty();
        if empty_input {
            tracing::warn!("no usable rows or columns left after audit");
        }
        tracing::debug!(
            steps = steps.len(),
            rows_before = raw_stats.row_count,
            rows_after = audited_stats.row_count,
            "structural audit finished"
        );
        AuditReport {
            table,
            steps,
            raw_stats,
            audited_stats,
            kind_mismatches,
            empty_input,
        }
    }

    /// Text columns whose present values are mostly numeric. Never converts.
    pub fn detect_kind_mismatches(&self, table: &Table) -> Vec<KindMismatch> {
        table
            .columns()
            .iter()
            .filter(|c| c.kind == ColumnKind::Text)
            .filter_map(|c| {
                let present = c.valid_count();
                if present == 0 {
                    return None;
                }
                let numeric = c
                    .cells
                    .iter()
                    .filter(|cell| match cell {
                        Cell::Text(s) => parse_number(s).is_some(),
                        Cell::Number(_) => true,
                        Cell::Absent => false,
                    })
                    .count();
                let ratio = numeric as f64 / present as f64;
                (ratio > self.config.numeric_mismatch_ratio).then(|| KindMismatch {
                    column: c.name.clone(),
                    declared: ColumnKind::Text,
                    inferred: ColumnKind::Numeric,
                    numeric_cells: numeric,
                    present_cells: present,
                    numeric_ratio: ratio,
                })
            })
            .collect()
    }
}

pub fn audit(table: &Table) -> AuditReport {
    Auditor::default().audit(table)
}

/// Re-apply a step log to the table it was recorded against.
pub fn replay(original: &Table, steps: &[AuditStep]) -> Result<Table> {
    let mut table = original.clone();
    for (i, step) in steps.iter().enumerate() {
        let mismatch = |what: &str, expected: usize, actual: usize| {
            TableLensError::Replay(format!(
                "step {i} ({:?}): expected {what} {expected}, table has {actual}",
                step.action
            ))
        };
        match (&step.action, &step.subject) {
            (AuditAction::NothingToClean | AuditAction::FlagKindMismatch, _) => {
                if step.before != table.row_count() {
                    return Err(mismatch("rows", step.before, table.row_count()));
                }
            }
            (AuditAction::RemoveEmptyRows, StepSubject::Rows(rows)) => {
                if step.before != table.row_count() {
                    return Err(mismatch("rows", step.before, table.row_count()));
                }
                if let Some(&bad) = rows.iter().find(|&&r| r >= table.row_count() || !table.is_row_empty(r)) {
                    return Err(TableLensError::Replay(format!("step {i}: row {bad} is not an empty row")));
                }
                table = table.without_rows(rows);
                if step.after != table.row_count() {
                    return Err(mismatch("rows after", step.after, table.row_count()));
                }
            }
            (AuditAction::RemoveEmptyColumns, StepSubject::Columns(names)) => {
                if step.before != table.column_count() {
                    return Err(mismatch("columns", step.before, table.column_count()));
                }
                for name in names {
                    match table.column(name) {
                        Some(c) if c.is_all_absent() => {}
                        _ => {
                            return Err(TableLensError::Replay(format!(
                                "step {i}: column '{name}' is missing or not empty"
                            )))
                        }
                    }
                }
                table = table.without_columns(names);
                if step.after != table.column_count() {
                    return Err(mismatch("columns after", step.after, table.column_count()));
                }
            }
            (action, _) => {
                return Err(TableLensError::Replay(format!(
                    "step {i}: {action:?} carries the wrong subject"
                )))
            }
        }
    }
    Ok(table)
}
