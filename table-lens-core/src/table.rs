use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use table_lens_common::{Result, TableLensError};

/// A single value. Absent covers both empty input and recognised missing tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Absent,
}

impl Cell {
    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Text rendering used for frequency counts and canonical output.
    pub fn render(&self) -> String {
        match self {
            Cell::Number(v) => format_number(*v),
            Cell::Text(s) => s.clone(),
            Cell::Absent => String::new(),
        }
    }
}

/// Shortest representation that parses back to the same f64.
pub fn format_number(v: f64) -> String {
    if v == 0.0 {
        return "0".into(); // folds -0.0
    }
    format!("{v}")
}

/// Finite numbers only; "inf" and "NaN" are not accepted as numeric values.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let cells: Vec<Cell> = values
            .into_iter()
            .map(|v| v.map_or(Cell::Absent, Cell::Number))
            .collect();
        Self::from_cells(name, cells)
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<&str>>) -> Self {
        let cells: Vec<Cell> = values
            .into_iter()
            .map(|v| v.map_or(Cell::Absent, |s| Cell::Text(s.to_owned())))
            .collect();
        Self::from_cells(name, cells)
    }

    /// Kind follows the cells: numeric only when every present cell is a number.
    pub fn from_cells(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        let name = name.into();
        let kind = if cells.iter().all(Cell::is_absent) {
            ColumnKind::Absent
        } else if cells.iter().all(|c| matches!(c, Cell::Number(_) | Cell::Absent)) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        };
        Self { name, kind, cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_absent()).count()
    }

    pub fn valid_count(&self) -> usize {
        self.cells.len() - self.missing_count()
    }

    pub fn is_all_absent(&self) -> bool {
        self.cells.iter().all(Cell::is_absent)
    }

    pub fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.iter().filter_map(Cell::as_f64)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let n = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != n) {
                return Err(TableLensError::Other(format!(
                    "column '{}' has {} cells, expected {n}",
                    bad.name,
                    bad.len()
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn total_cells(&self) -> usize {
        self.row_count() * self.column_count()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0 || self.column_count() == 0
    }

    pub fn row(&self, idx: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.cells[idx]).collect()
    }

    pub fn is_row_empty(&self, idx: usize) -> bool {
        self.columns.iter().all(|c| c.cells[idx].is_absent())
    }

    pub fn row_has_missing(&self, idx: usize) -> bool {
        self.columns.iter().any(|c| c.cells[idx].is_absent())
    }

    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    pub fn rows_with_missing(&self) -> usize {
        (0..self.row_count()).filter(|&r| self.row_has_missing(r)).count()
    }

    pub fn columns_with_missing(&self) -> usize {
        self.columns.iter().filter(|c| c.missing_count() > 0).count()
    }

    /// `true` at every row that repeats an earlier row exactly.
    pub fn duplicate_flags(&self) -> Vec<bool> {
        let n = self.row_count();
        let mut flags = vec![false; n];
        // fingerprint buckets; rows are compared cell by cell inside a bucket
        let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
        for (row, flag) in flags.iter_mut().enumerate() {
            let bucket = buckets.entry(self.hash_row(row)).or_default();
            if bucket.iter().any(|&prev| self.rows_equal(prev, row)) {
                *flag = true;
            } else {
                bucket.push(row);
            }
        }
        flags
    }

    pub fn duplicate_row_count(&self) -> usize {
        self.duplicate_flags().into_iter().filter(|d| *d).count()
    }

    fn rows_equal(&self, a: usize, b: usize) -> bool {
        self.columns.iter().all(|c| cells_equal(&c.cells[a], &c.cells[b]))
    }

    fn hash_row(&self, row: usize) -> u64 {
        use xxhash_rust::xxh3::xxh3_64;
        let mut row_bytes = Vec::new();
        for col in &self.columns {
            match &col.cells[row] {
                Cell::Number(v) => {
                    row_bytes.push(1);
                    let v = if *v == 0.0 { 0.0 } else { *v };
                    row_bytes.extend_from_slice(&v.to_le_bytes());
                }
                Cell::Text(s) => {
                    row_bytes.push(2);
                    row_bytes.extend_from_slice(&(s.len() as u64).to_le_bytes());
                    row_bytes.extend_from_slice(s.as_bytes());
                }
                Cell::Absent => row_bytes.push(0xFF),
            }
        }
        xxh3_64(&row_bytes)
    }

    /// Copy keeping only rows whose flag is `true`.
    pub fn retain_rows(&self, keep: &[bool]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                kind: c.kind,
                cells: c
                    .cells
                    .iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(cell, _)| cell.clone())
                    .collect(),
            })
            .collect();
        Table { columns }
    }

    pub fn without_rows(&self, rows: &[usize]) -> Table {
        let mut keep = vec![true; self.row_count()];
        for &r in rows {
            if let Some(k) = keep.get_mut(r) {
                *k = false;
            }
        }
        self.retain_rows(&keep)
    }

    pub fn without_columns(&self, names: &[String]) -> Table {
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.name))
            .cloned()
            .collect();
        Table { columns }
    }

    pub fn replace_column(&mut self, column: Column) -> Result<()> {
        let expected = self.row_count();
        let slot = self
            .columns
            .iter_mut()
            .find(|c| c.name == column.name)
            .ok_or_else(|| TableLensError::Other(format!("no column named '{}'", column.name)))?;
        if column.len() != expected {
            return Err(TableLensError::Other(format!(
                "replacement for '{}' has {} cells, expected {expected}",
                column.name,
                column.len()
            )));
        }
        *slot = column;
        Ok(())
    }
}

fn cells_equal(a: &Cell, b: &Cell) -> bool {
    match (a, b) {
        (Cell::Number(x), Cell::Number(y)) => x == y,
        (Cell::Text(x), Cell::Text(y)) => x == y,
        (Cell::Absent, Cell::Absent) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(1.0), None, Some(2.0)]),
            Column::text("b", vec![Some("x"), Some("x"), None, Some("y")]),
        ])
        .unwrap()
    }

    #[test]
    fn kinds_follow_cells() {
        let t = sample();
        assert_eq!(t.columns()[0].kind, ColumnKind::Numeric);
        assert_eq!(t.columns()[1].kind, ColumnKind::Text);
        assert_eq!(Column::numeric("e", vec![None, None]).kind, ColumnKind::Absent);
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::numeric("a", vec![Some(1.0)]),
            Column::numeric("b", vec![Some(1.0), Some(2.0)]),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn missing_and_duplicates() {
        let t = sample();
        assert_eq!(t.missing_count(), 2);
        assert_eq!(t.rows_with_missing(), 1);
        assert_eq!(t.columns_with_missing(), 2);
        assert_eq!(t.duplicate_flags(), vec![false, true, false, false]);
        assert!(t.is_row_empty(2));
    }

    #[test]
    fn signed_zero_rows_are_duplicates() {
        let t = Table::new(vec![Column::numeric("z", vec![Some(0.0), Some(-0.0)])]).unwrap();
        assert_eq!(t.duplicate_row_count(), 1);
    }

    #[test]
    fn text_and_number_never_equal() {
        let t = Table::new(vec![Column {
            name: "m".into(),
            kind: ColumnKind::Text,
            cells: vec![Cell::Number(1.0), Cell::Text("1".into())],
        }])
        .unwrap();
        assert_eq!(t.duplicate_row_count(), 0);
    }

    #[test]
    fn row_and_column_removal() {
        let t = sample();
        let r = t.without_rows(&[2]);
        assert_eq!(r.row_count(), 3);
        let c = r.without_columns(&["a".to_string()]);
        assert_eq!(c.column_names(), vec!["b".to_string()]);
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number(" 4.5 "), Some(4.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1), "0.1");
    }
}
