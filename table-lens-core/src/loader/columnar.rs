use super::{raw_text, RawCell, TableBuilder};
use crate::table::{format_number, Table};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use table_lens_common::{Result, TableLensError};

pub(super) fn parse(bytes: &[u8], tokens: &[String]) -> Result<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.with_batch_size(65536).build()?;
    let mut table = TableBuilder::with_header(names);
    for batch_result in reader {
        let batch = batch_result?;
        let mut columns = batch
            .columns()
            .iter()
            .map(|col| column_cells(col, tokens))
            .collect::<Result<Vec<_>>>()?;
        for row in 0..batch.num_rows() {
            table.push_row(
                columns
                    .iter_mut()
                    .map(|c| std::mem::replace(&mut c[row], RawCell::Absent))
                    .collect(),
            );
        }
    }
    table.finish()
}

// numeric arrow types are widened to f64, everything else is rendered as text
fn column_cells(col: &ArrayRef, tokens: &[String]) -> Result<Vec<RawCell>> {
    if col.data_type().is_numeric() {
        let widened = cast(col.as_ref(), &DataType::Float64)?;
        let arr = widened
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| TableLensError::Other("Float64 cast returned another array type".into()))?;
        Ok((0..arr.len())
            .map(|i| {
                let v = arr.value(i);
                if arr.is_null(i) || !v.is_finite() {
                    RawCell::Absent
                } else {
                    RawCell::Number(v, format_number(v))
                }
            })
            .collect())
    } else {
        let rendered = cast(col.as_ref(), &DataType::Utf8)?;
        let arr = rendered
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| TableLensError::Other("Utf8 cast returned another array type".into()))?;
        Ok((0..arr.len())
            .map(|i| {
                if arr.is_null(i) {
                    RawCell::Absent
                } else {
                    raw_text(arr.value(i), tokens)
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, ColumnKind};
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;

    fn fixture() -> Vec<u8> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let ids = Arc::new(Int32Array::from(vec![1, 2, 3]));
        let names = Arc::new(StringArray::from(vec![Some("alice"), Some("bob"), None]));
        let batch = RecordBatch::try_new(schema.clone(), vec![ids, names]).unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        buf
    }

    #[test]
    fn reads_parquet_columns() {
        let t = parse(&fixture(), &[]).unwrap();
        assert_eq!(t.column_names(), vec!["id", "name"]);
        assert_eq!(t.columns()[0].kind, ColumnKind::Numeric);
        assert_eq!(t.columns()[0].cells[2], Cell::Number(3.0));
        assert_eq!(t.columns()[1].cells[2], Cell::Absent);
    }

    #[test]
    fn rejects_non_parquet_bytes() {
        let err = parse(b"a,b\n1,2\n", &[]).unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }
}
