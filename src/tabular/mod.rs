//! Utilities for working with Arrow record batches.
//!
//! Every pipeline stage consumes and produces `RecordBatch` snapshots;
//! missing values are Arrow nulls, never sentinel values. These helpers
//! cover column lookup with typed downcasts, projection in caller order,
//! row selection via the `take` kernel, and null-mask extraction.

use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    UInt32Array,
};
use arrow::compute::take;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Find the index of a named column, failing with `ColumnNotFound`
pub fn column_index(batch: &RecordBatch, name: &str) -> Result<usize> {
    batch
        .schema()
        .index_of(name)
        .map_err(|_| Error::ColumnNotFound {
            column: name.to_string(),
        })
}

/// Get a column array by name
pub fn column(batch: &RecordBatch, name: &str) -> Result<ArrayRef> {
    let idx = column_index(batch, name)?;
    Ok(batch.column(idx).clone())
}

/// Downcast a named column to a concrete array type
pub fn downcast_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    expected: &str,
) -> Result<&'a T> {
    let idx = column_index(batch, name)?;
    let col = batch.column(idx);
    col.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::ColumnType {
            column: name.to_string(),
            expected: expected.to_string(),
            actual: format!("{:?}", col.data_type()),
        })
}

/// Get a `Utf8` column by name
pub fn str_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    downcast_column::<StringArray>(batch, name, "Utf8")
}

/// Get a `Float64` column by name
pub fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    downcast_column::<Float64Array>(batch, name, "Float64")
}

/// Get an `Int64` column by name
pub fn i64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    downcast_column::<Int64Array>(batch, name, "Int64")
}

/// Get a `Date32` column by name
pub fn date32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Date32Array> {
    downcast_column::<Date32Array>(batch, name, "Date32")
}

/// Convert a `Date32` cell (days since the Unix epoch) to a `NaiveDate`
#[must_use]
pub fn date_value(array: &Date32Array, row: usize) -> Option<NaiveDate> {
    if row >= array.len() || array.is_null(row) {
        return None;
    }
    let days = array.value(row);
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_days(chrono::Days::new(days as u64)))
}

/// Convert a `NaiveDate` to its `Date32` representation
#[must_use]
pub fn date_to_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(date);
    (date - epoch).num_days() as i32
}

/// Read a numeric cell as `f64` from a `Float64`, `Int64` or `Boolean` column
pub fn numeric_value(array: &ArrayRef, column: &str, row: usize) -> Result<Option<f64>> {
    if array.is_null(row) {
        return Ok(None);
    }
    if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
        return Ok(Some(a.value(row)));
    }
    if let Some(a) = array.as_any().downcast_ref::<Int64Array>() {
        return Ok(Some(a.value(row) as f64));
    }
    if let Some(a) = array.as_any().downcast_ref::<BooleanArray>() {
        return Ok(Some(if a.value(row) { 1.0 } else { 0.0 }));
    }
    Err(Error::ColumnType {
        column: column.to_string(),
        expected: "Float64, Int64 or Boolean".to_string(),
        actual: format!("{:?}", array.data_type()),
    })
}

/// Project a batch to the named columns, preserving the caller's order
pub fn project(batch: &RecordBatch, columns: &[&str]) -> Result<RecordBatch> {
    let indices = columns
        .iter()
        .map(|name| column_index(batch, name))
        .collect::<Result<Vec<_>>>()?;
    Ok(batch.project(&indices)?)
}

/// Select rows by index, preserving the order of `indices`
pub fn take_rows(batch: &RecordBatch, indices: &[usize]) -> Result<RecordBatch> {
    let idx = UInt32Array::from(
        indices
            .iter()
            .map(|&i| u32::try_from(i).ok())
            .collect::<Vec<Option<u32>>>(),
    );
    take_columns(batch, &idx)
}

/// Select rows by optional index; `None` produces a null row (left-join fill).
///
/// The output schema marks every field nullable, since unmatched rows carry
/// nulls regardless of the source nullability.
pub fn take_rows_nullable(batch: &RecordBatch, indices: &[Option<usize>]) -> Result<RecordBatch> {
    let idx = UInt32Array::from(
        indices
            .iter()
            .map(|i| i.and_then(|i| u32::try_from(i).ok()))
            .collect::<Vec<Option<u32>>>(),
    );
    let columns = batch
        .columns()
        .iter()
        .map(|col| take(col.as_ref(), &idx, None))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let fields: Vec<arrow::datatypes::Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone().with_nullable(true))
        .collect();
    let schema = std::sync::Arc::new(arrow::datatypes::Schema::new(fields));
    Ok(RecordBatch::try_new(schema, columns)?)
}

fn take_columns(batch: &RecordBatch, idx: &UInt32Array) -> Result<RecordBatch> {
    let columns = batch
        .columns()
        .iter()
        .map(|col| take(col.as_ref(), idx, None))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}

/// Per-row missingness mask for a named column (`true` = missing)
pub fn null_mask(batch: &RecordBatch, name: &str) -> Result<Vec<bool>> {
    let col = column(batch, name)?;
    Ok((0..col.len()).map(|row| col.is_null(row)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("score", DataType::Float64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["a", "b", "c"])),
                Arc::new(Float64Array::from(vec![Some(1.0), None, Some(3.0)])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_column_not_found() {
        let batch = sample_batch();
        let err = column(&batch, "absent").unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { column } if column == "absent"));
    }

    #[test]
    fn test_downcast_type_mismatch() {
        let batch = sample_batch();
        let err = f64_column(&batch, "id").unwrap_err();
        assert!(matches!(err, Error::ColumnType { .. }));
    }

    #[test]
    fn test_take_rows_preserves_order() {
        let batch = sample_batch();
        let taken = take_rows(&batch, &[2, 0]).unwrap();
        let ids = str_column(&taken, "id").unwrap();
        assert_eq!(ids.value(0), "c");
        assert_eq!(ids.value(1), "a");
    }

    #[test]
    fn test_take_rows_nullable_fills_nulls() {
        let batch = sample_batch();
        let taken = take_rows_nullable(&batch, &[Some(1), None]).unwrap();
        let ids = str_column(&taken, "id").unwrap();
        assert_eq!(ids.value(0), "b");
        assert!(ids.is_null(1));
    }

    #[test]
    fn test_null_mask() {
        let batch = sample_batch();
        assert_eq!(null_mask(&batch, "score").unwrap(), vec![false, true, false]);
    }

    #[test]
    fn test_date_round_trip() {
        let date = NaiveDate::from_ymd_opt(2019, 6, 15).unwrap();
        let days = date_to_days(date);
        let array = Date32Array::from(vec![Some(days)]);
        assert_eq!(date_value(&array, 0), Some(date));
    }
}
