use super::{raw_text, RawCell, TableBuilder};
use crate::table::{format_number, Table};
use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use chrono::{NaiveDateTime, NaiveTime};
use std::io::Cursor;
use table_lens_common::{Result, TableLensError};

const FORMAT: &str = "spreadsheet";

/// First worksheet only; its first row is the header.
pub(super) fn parse(bytes: &[u8], tokens: &[String]) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| TableLensError::parse(FORMAT, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TableLensError::parse(FORMAT, "workbook has no worksheets"))?
        .map_err(|e| TableLensError::parse(FORMAT, e))?;
    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(header_name).collect(),
        None => return Err(TableLensError::parse(FORMAT, "first worksheet is empty")),
    };
    let mut table = TableBuilder::with_header(header);
    for row in rows {
        table.push_row(row.iter().map(|c| cell(c, tokens)).collect());
    }
    table.finish()
}

fn header_name(c: &Data) -> String {
    match c {
        Data::Empty => String::new(),
        Data::Float(f) => format_number(*f),
        other => other.to_string().trim().to_owned(),
    }
}

fn cell(c: &Data, tokens: &[String]) -> RawCell {
    match c {
        Data::Empty | Data::Error(_) => RawCell::Absent,
        Data::Int(i) => RawCell::Number(*i as f64, i.to_string()),
        Data::Float(f) if f.is_finite() => RawCell::Number(*f, format_number(*f)),
        Data::String(s) => raw_text(s, tokens),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => date_cell(dt),
        Data::DateTimeIso(s) => raw_text(s, tokens),
        other => raw_text(&other.to_string(), tokens),
    }
}

/// Dates stay dates: ISO text, not the serial number the workbook stores.
fn date_cell(dt: &ExcelDateTime) -> RawCell {
    let serial = dt.as_f64();
    if dt.is_duration() {
        return RawCell::Number(serial, format_number(serial));
    }
    match dt.as_datetime() {
        Some(ts) => RawCell::Text(render_datetime(ts)),
        None => RawCell::Number(serial, format_number(serial)),
    }
}

fn render_datetime(ts: NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = parse(b"definitely not a workbook", &[]).unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }

    #[test]
    fn cell_mapping() {
        let tokens = vec!["NA".to_string()];
        assert_eq!(cell(&Data::Int(4), &tokens), RawCell::Number(4.0, "4".into()));
        assert_eq!(cell(&Data::Float(2.5), &tokens), RawCell::Number(2.5, "2.5".into()));
        assert_eq!(cell(&Data::String("NA".into()), &tokens), RawCell::Absent);
        assert_eq!(cell(&Data::Empty, &tokens), RawCell::Absent);
        assert_eq!(cell(&Data::Bool(true), &tokens), RawCell::Text("true".into()));
        assert_eq!(header_name(&Data::Float(2024.0)), "2024");
    }

    #[test]
    fn date_cells_render_as_iso_text() {
        use calamine::ExcelDateTimeType;
        // 45292 is 2024-01-01 in the 1900 date system
        let day = ExcelDateTime::new(45292.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell(&Data::DateTime(day), &[]), RawCell::Text("2024-01-01".into()));
        let noon = ExcelDateTime::new(45292.5, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell(&Data::DateTime(noon), &[]), RawCell::Text("2024-01-01 12:00:00".into()));
        let span = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false);
        assert_eq!(cell(&Data::DateTime(span), &[]), RawCell::Number(1.5, "1.5".into()));
        assert_eq!(
            cell(&Data::DateTimeIso("2024-02-03".into()), &[]),
            RawCell::Text("2024-02-03".into())
        );
    }
}
