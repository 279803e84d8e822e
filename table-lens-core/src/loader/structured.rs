use super::{raw_text, RawCell, TableBuilder};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use table_lens_common::{Result, TableLensError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonOrientation {
    /// `{col: [..]}`, `{col: {row: v}}` or an array of record objects
    Columns,
    /// `{row: {col: v}}`
    Index,
    /// one object per line
    Lines,
}

/// Fixed precedence; the first orientation that parses wins.
pub const ORIENTATION_PRECEDENCE: [JsonOrientation; 3] =
    [JsonOrientation::Columns, JsonOrientation::Index, JsonOrientation::Lines];

pub(super) fn parse(bytes: &[u8], tokens: &[String]) -> Result<(Table, JsonOrientation)> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| TableLensError::parse("structured object", format!("not valid utf-8: {e}")))?;
    let document: std::result::Result<Value, String> =
        serde_json::from_str(text).map_err(|e| e.to_string());
    let mut failures = Vec::new();
    for (attempt, orientation) in ORIENTATION_PRECEDENCE.iter().enumerate() {
        let outcome = match orientation {
            JsonOrientation::Columns => document.as_ref().map_err(Clone::clone).and_then(|doc| columns(doc, tokens)),
            JsonOrientation::Index => document.as_ref().map_err(Clone::clone).and_then(|doc| index(doc, tokens)),
            JsonOrientation::Lines => lines(text, tokens),
        };
        match outcome {
            Ok(table) => {
                if attempt > 0 {
                    tracing::warn!(orientation = ?orientation, "earlier json orientations rejected, used fallback");
                }
                return Ok((table, *orientation));
            }
            Err(reason) => failures.push(format!("{orientation:?}: {reason}")),
        }
    }
    Err(TableLensError::parse("structured object", failures.join("; ")))
}

type Attempt = std::result::Result<Table, String>;

fn columns(doc: &Value, tokens: &[String]) -> Attempt {
    match doc {
        Value::Array(items) => {
            let mut table = TableBuilder::new();
            for (i, item) in items.iter().enumerate() {
                let obj = item
                    .as_object()
                    .ok_or_else(|| format!("array element {i} is not an object"))?;
                table.push_record(record_fields(obj, tokens));
            }
            table.finish().map_err(|e| e.to_string())
        }
        Value::Object(map) => {
            let names: Vec<String> = map.keys().cloned().collect();
            let mut cells: Vec<Vec<RawCell>> = Vec::with_capacity(map.len());
            let mut row_keys: Option<Vec<&String>> = None;
            let mut row_len: Option<usize> = None;
            for (name, values) in map {
                let column: Vec<RawCell> = match values {
                    Value::Array(items) => items.iter().map(|v| cell(v, tokens)).collect(),
                    Value::Object(rows) => {
                        let keys: Vec<&String> = rows.keys().collect();
                        let expected = row_keys.get_or_insert_with(|| keys.clone());
                        if *expected != keys {
                            return Err(format!("column '{name}' is indexed differently"));
                        }
                        rows.values().map(|v| cell(v, tokens)).collect()
                    }
                    _ => return Err(format!("column '{name}' is not an array or object")),
                };
                let expected = *row_len.get_or_insert(column.len());
                if expected != column.len() {
                    return Err(format!("column '{name}' has {} values, expected {expected}", column.len()));
                }
                cells.push(column);
            }
            let mut table = TableBuilder::with_header(names);
            for row in 0..row_len.unwrap_or(0) {
                table.push_row(cells.iter_mut().map(|c| std::mem::replace(&mut c[row], RawCell::Absent)).collect());
            }
            table.finish().map_err(|e| e.to_string())
        }
        _ => Err("top-level value is neither an object nor an array".into()),
    }
}

fn index(doc: &Value, tokens: &[String]) -> Attempt {
    let map = doc.as_object().ok_or("top-level value is not an object")?;
    let mut table = TableBuilder::new();
    for (key, row) in map {
        let obj = row.as_object().ok_or_else(|| format!("row '{key}' is not an object"))?;
        table.push_record(record_fields(obj, tokens));
    }
    table.finish().map_err(|e| e.to_string())
}

fn lines(text: &str, tokens: &[String]) -> Attempt {
    let mut table = TableBuilder::new();
    let mut seen = 0usize;
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| format!("line {}: {e}", i + 1))?;
        let obj = value
            .as_object()
            .ok_or_else(|| format!("line {} is not an object", i + 1))?;
        table.push_record(record_fields(obj, tokens));
        seen += 1;
    }
    if seen == 0 {
        return Err("no records".into());
    }
    table.finish().map_err(|e| e.to_string())
}

fn record_fields(obj: &Map<String, Value>, tokens: &[String]) -> Vec<(String, RawCell)> {
    obj.iter().map(|(k, v)| (k.clone(), cell(v, tokens))).collect()
}

fn cell(v: &Value, tokens: &[String]) -> RawCell {
    match v {
        Value::Null => RawCell::Absent,
        Value::Bool(b) => RawCell::Text(b.to_string()),
        Value::Number(n) => match n.as_f64().filter(|f| f.is_finite()) {
            Some(f) => RawCell::Number(f, n.to_string()),
            None => RawCell::Text(n.to_string()),
        },
        Value::String(s) => raw_text(s, tokens),
        nested => RawCell::Text(nested.to_string()), // kept as compact json text
    }
}
