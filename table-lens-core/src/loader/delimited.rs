use super::{raw_text, TableBuilder};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use table_lens_common::{Result, TableLensError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Tried in order; the first encoding that decodes wins.
pub const ENCODING_FALLBACKS: [TextEncoding; 2] = [TextEncoding::Utf8, TextEncoding::Latin1];

impl TextEncoding {
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> std::result::Result<Cow<'a, str>, String> {
        match self {
            Self::Utf8 => {
                let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(body)
                    .map(Cow::Borrowed)
                    .map_err(|e| format!("utf-8: {e}"))
            }
            // every byte maps to the code point of the same value
            Self::Latin1 => Ok(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
        }
    }
}

pub(super) fn decode(bytes: &[u8]) -> Result<(Cow<'_, str>, TextEncoding)> {
    let mut failures = Vec::new();
    for (attempt, enc) in ENCODING_FALLBACKS.iter().enumerate() {
        match enc.decode(bytes) {
            Ok(text) => {
                if attempt > 0 {
                    tracing::warn!(encoding = ?enc, "default encoding failed, decoded with fallback");
                }
                return Ok((text, *enc));
            }
            Err(reason) => failures.push(reason),
        }
    }
    Err(TableLensError::parse("delimited text", failures.join("; ")))
}

pub(super) fn parse(bytes: &[u8], delimiter: u8, tokens: &[String]) -> Result<(Table, TextEncoding)> {
    let (text, encoding) = decode(bytes)?;
    if text.trim().is_empty() {
        // canonical form of a zero-column table
        tracing::warn!("delimited input has no header; loaded as an empty table");
        return Ok((Table::default(), encoding));
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| TableLensError::parse("delimited text", e))?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();
    if header.is_empty() || (header.len() == 1 && header[0].is_empty()) {
        return Err(TableLensError::parse("delimited text", "no columns to parse"));
    }
    let width = header.len();
    let mut table = TableBuilder::with_header(header);
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| TableLensError::parse("delimited text", e))?;
        if record.len() > width {
            // line 1 is the header
            return Err(TableLensError::parse(
                "delimited text",
                format!("expected {width} fields in line {}, saw {}", i + 2, record.len()),
            ));
        }
        let cells = record.iter().map(|f| raw_text(f, tokens)).collect();
        table.push_row(cells);
    }
    Ok((table.finish()?, encoding))
}
