use super::{raw_text, RawCell, TableBuilder};
use crate::table::Table;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use table_lens_common::{Result, TableLensError};

const FORMAT: &str = "markup";

// depth of the element currently open: 1 = root, 2 = row, 3 = field
pub(super) fn parse(bytes: &[u8], tokens: &[String]) -> Result<Table> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut table = TableBuilder::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut record: Vec<(String, RawCell)> = Vec::new();
    // a row element's own text becomes a field named after the element
    let mut row_value: (String, String) = (String::new(), String::new());
    let mut field: Option<(String, String)> = None;
    loop {
        let event = reader.read_event().map_err(|e| {
            TableLensError::parse(FORMAT, format!("at byte {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(e) => {
                depth += 1;
                match depth {
                    1 => saw_root = true,
                    2 => {
                        record = attributes(&e, tokens)?;
                        row_value = (local_name(&e), String::new());
                    }
                    3 => field = Some((local_name(&e), String::new())),
                    _ => {} // deeper nesting is not tabular
                }
            }
            Event::Empty(e) => match depth + 1 {
                1 => saw_root = true,
                2 => table.push_record(attributes(&e, tokens)?),
                3 => record.push((local_name(&e), RawCell::Absent)),
                _ => {}
            },
            Event::Text(t) if depth == 2 || depth == 3 => {
                let text = t.unescape().map_err(|e| TableLensError::parse(FORMAT, e))?;
                if let Some(buf) = text_target(depth, &mut row_value, &mut field) {
                    buf.push_str(&text);
                }
            }
            Event::CData(c) if depth == 2 || depth == 3 => {
                if let Some(buf) = text_target(depth, &mut row_value, &mut field) {
                    buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                match depth {
                    2 => {
                        let (name, text) = std::mem::take(&mut row_value);
                        if !text.trim().is_empty() {
                            record.push((name, raw_text(&text, tokens)));
                        }
                        table.push_record(std::mem::take(&mut record));
                    }
                    3 => {
                        if let Some((name, text)) = field.take() {
                            record.push((name, raw_text(&text, tokens)));
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !saw_root {
        return Err(TableLensError::parse(FORMAT, "document has no root element"));
    }
    table.finish()
}

fn text_target<'a>(
    depth: usize,
    row_value: &'a mut (String, String),
    field: &'a mut Option<(String, String)>,
) -> Option<&'a mut String> {
    match depth {
        2 => Some(&mut row_value.1),
        _ => field.as_mut().map(|(_, buf)| buf),
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>, tokens: &[String]) -> Result<Vec<(String, RawCell)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| TableLensError::parse(FORMAT, err))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| TableLensError::parse(FORMAT, err))?;
        out.push((key, raw_text(&value, tokens)));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, ColumnKind};

    fn run(xml: &str) -> Result<Table> {
        parse(xml.as_bytes(), &[])
    }

    #[test]
    fn child_elements_become_columns() {
        let t = run(r#"<?xml version="1.0"?>
            <data>
              <row><name>Ann</name><age>31</age></row>
              <row><name>Bo &amp; Co</name><age/></row>
            </data>"#)
        .unwrap();
        assert_eq!(t.column_names(), vec!["name", "age"]);
        assert_eq!(t.columns()[0].cells[1], Cell::Text("Bo & Co".into()));
        assert_eq!(t.columns()[1].kind, ColumnKind::Numeric);
        assert_eq!(t.columns()[1].cells[1], Cell::Absent);
    }

    #[test]
    fn attributes_are_fields() {
        let t = run(r#"<rows><r id="1" tag="a"/><r id="2"><note>hi</note></r></rows>"#).unwrap();
        assert_eq!(t.column_names(), vec!["id", "tag", "note"]);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.columns()[1].cells[1], Cell::Absent);
    }

    #[test]
    fn value_only_rows_keep_their_text() {
        let t = run(r#"<prices><price>5</price><price>7</price><price currency="EUR">9</price><price/></prices>"#).unwrap();
        assert_eq!(t.column_names(), vec!["price", "currency"]);
        assert_eq!(t.row_count(), 4);
        assert_eq!(t.columns()[0].kind, ColumnKind::Numeric);
        assert_eq!(
            t.columns()[0].cells,
            vec![Cell::Number(5.0), Cell::Number(7.0), Cell::Number(9.0), Cell::Absent]
        );
        assert_eq!(t.columns()[1].cells[2], Cell::Text("EUR".into()));
    }

    #[test]
    fn whitespace_between_fields_is_not_a_value() {
        let t = run("<data>\n  <row>\n    <a>1</a>\n  </row>\n</data>").unwrap();
        assert_eq!(t.column_names(), vec!["a"]);
    }

    #[test]
    fn malformed_markup_fails() {
        let err = run("<data><row><a>1</b></row></data>").unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }

    #[test]
    fn no_root_fails() {
        assert!(run("").is_err());
    }
}
