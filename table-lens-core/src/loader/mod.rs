mod columnar;
mod delimited;
mod markup;
mod spreadsheet;
mod structured;

pub use delimited::TextEncoding;
pub use structured::JsonOrientation;

use crate::table::{parse_number, Cell, Column, Table};
use serde::{Deserialize, Serialize};
use table_lens_common::{LoaderConfig, Result, TableLensError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Delimited { delimiter: u8 },
    Spreadsheet,
    StructuredObject,
    Markup,
    Columnar,
}

impl SourceFormat {
    /// Accepts extensions with or without the leading dot, in any case.
    pub fn from_extension(ext: &str) -> Result<Self> {
        let normalized = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "csv" | "txt" => Ok(Self::Delimited { delimiter: b',' }),
            "tsv" | "tab" => Ok(Self::Delimited { delimiter: b'\t' }),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Spreadsheet),
            "json" | "jsonl" | "ndjson" => Ok(Self::StructuredObject),
            "xml" => Ok(Self::Markup),
            "parquet" => Ok(Self::Columnar),
            _ => Err(TableLensError::UnsupportedFormat { extension: normalized }),
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            Self::Delimited { .. } => "delimited text",
            Self::Spreadsheet => "spreadsheet",
            Self::StructuredObject => "structured object",
            Self::Markup => "markup",
            Self::Columnar => "columnar",
        }
    }
}

/// How a source was read; kept next to the audit for transparency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub format: SourceFormat,
    pub byte_len: usize,
    pub encoding: Option<TextEncoding>,
    pub orientation: Option<JsonOrientation>,
    pub row_count: usize,
    pub column_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn load(&self, bytes: &[u8], extension: &str) -> Result<Table> {
        self.load_with_info(bytes, extension).map(|(t, _)| t)
    }

    pub fn load_with_info(&self, bytes: &[u8], extension: &str) -> Result<(Table, SourceInfo)> {
        let format = SourceFormat::from_extension(extension)?;
        let tokens = &self.config.missing_tokens;
        let mut encoding = None;
        let mut orientation = None;
        let table = match format {
            SourceFormat::Delimited { delimiter } => {
                let (t, enc) = delimited::parse(bytes, delimiter, tokens)?;
                encoding = Some(enc);
                t
            }
            SourceFormat::Spreadsheet => spreadsheet::parse(bytes, tokens)?,
            SourceFormat::StructuredObject => {
                let (t, o) = structured::parse(bytes, tokens)?;
                orientation = Some(o);
                t
            }
            SourceFormat::Markup => markup::parse(bytes, tokens)?,
            SourceFormat::Columnar => columnar::parse(bytes, tokens)?,
        };
        tracing::debug!(
            format = format.family(),
            rows = table.row_count(),
            columns = table.column_count(),
            "loaded table"
        );
        let info = SourceInfo {
            format,
            byte_len: bytes.len(),
            encoding,
            orientation,
            row_count: table.row_count(),
            column_count: table.column_count(),
        };
        Ok((table, info))
    }
}

/// Load with the default missing-value tokens.
pub fn load(bytes: &[u8], extension: &str) -> Result<Table> {
    Loader::default().load(bytes, extension)
}

// --- raw cells and the shared table builder ---

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawCell {
    Absent,
    Text(String),
    Number(f64, String), // typed number plus its source text
}

pub(crate) fn raw_text(s: &str, tokens: &[String]) -> RawCell {
    let t = s.trim();
    if t.is_empty() || tokens.iter().any(|tok| tok == t) {
        RawCell::Absent
    } else {
        RawCell::Text(s.to_owned())
    }
}

pub(crate) struct TableBuilder {
    names: Vec<String>,
    columns: Vec<Vec<RawCell>>,
    rows: usize,
}

impl TableBuilder {
    pub(crate) fn new() -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            rows: 0,
        }
    }

    pub(crate) fn with_header(names: Vec<String>) -> Self {
        let columns = names.iter().map(|_| Vec::new()).collect();
        Self {
            names,
            columns,
            rows: 0,
        }
    }

    /// Positional row; short rows are padded with absent cells.
    pub(crate) fn push_row(&mut self, cells: Vec<RawCell>) {
        let mut cells = cells.into_iter();
        for col in self.columns.iter_mut() {
            col.push(cells.next().unwrap_or(RawCell::Absent));
        }
        self.rows += 1;
    }

    /// Keyed row; unseen keys add a column, the first value wins for repeated keys.
    pub(crate) fn push_record(&mut self, fields: Vec<(String, RawCell)>) {
        for (name, cell) in fields {
            let idx = match self.names.iter().position(|n| *n == name) {
                Some(i) => i,
                None => {
                    self.names.push(name);
                    self.columns.push(Vec::new());
                    self.columns.len() - 1
                }
            };
            let col = &mut self.columns[idx];
            if col.len() > self.rows {
                continue;
            }
            col.resize(self.rows, RawCell::Absent);
            col.push(cell);
        }
        self.rows += 1;
        for col in self.columns.iter_mut() {
            col.resize(self.rows, RawCell::Absent);
        }
    }

    pub(crate) fn finish(self) -> Result<Table> {
        let rows = self.rows;
        let names = normalize_header(self.names);
        let columns = names
            .into_iter()
            .zip(self.columns)
            .map(|(name, mut cells)| {
                cells.resize(rows, RawCell::Absent);
                infer_column(name, cells)
            })
            .collect();
        Table::new(columns)
    }
}

/// Numeric when every present value is a number, otherwise text with the source text kept.
fn infer_column(name: String, cells: Vec<RawCell>) -> Column {
    let numeric = cells.iter().all(|c| match c {
        RawCell::Absent | RawCell::Number(..) => true,
        RawCell::Text(s) => parse_number(s).is_some(),
    });
    let cells: Vec<Cell> = cells
        .into_iter()
        .map(|c| match c {
            RawCell::Absent => Cell::Absent,
            RawCell::Number(v, text) => {
                if numeric {
                    Cell::Number(v)
                } else {
                    Cell::Text(text)
                }
            }
            RawCell::Text(s) => match parse_number(&s) {
                Some(v) if numeric => Cell::Number(v),
                _ => Cell::Text(s),
            },
        })
        .collect();
    let kind = if cells.iter().all(Cell::is_absent) {
        crate::table::ColumnKind::Absent
    } else if numeric {
        crate::table::ColumnKind::Numeric
    } else {
        crate::table::ColumnKind::Text
    };
    Column { name, kind, cells }
}

fn normalize_header(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for (i, name) in names.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while out.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        out.push(candidate);
    }
    out
}
