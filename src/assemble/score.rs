//! Derived total scores over component items.

use arrow::array::Float64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::tabular;

/// Per-component recoding applied before summation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recode {
    /// Use the raw value
    Identity,
    /// Flip a 0/1 indicator (0 -> 1, 1 -> 0)
    FlipBinary,
    /// Reverse-key an item scored against `max` (value -> max - value)
    Reverse {
        /// Sum of the scale's minimum and maximum item value
        max: f64,
    },
}

impl Recode {
    fn apply(self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::FlipBinary => 1.0 - value,
            Self::Reverse { max } => max - value,
        }
    }
}

/// Append a row-wise total of the recoded components as a new `Float64`
/// column named `out_col`.
///
/// The total is null whenever any component is null; there is no
/// partial-sum behavior. The output column name must not already exist.
pub fn derive_total_score(
    table: &RecordBatch,
    out_col: &str,
    components: &[(&str, Recode)],
) -> Result<RecordBatch> {
    if table.schema().index_of(out_col).is_ok() {
        return Err(Error::DuplicateColumn {
            column: out_col.to_string(),
        });
    }

    let arrays = components
        .iter()
        .map(|(name, _)| tabular::column(table, name))
        .collect::<Result<Vec<_>>>()?;

    let mut totals: Vec<Option<f64>> = Vec::with_capacity(table.num_rows());
    for row in 0..table.num_rows() {
        let mut total = Some(0.0);
        for (array, (name, recode)) in arrays.iter().zip(components) {
            match tabular::numeric_value(array, name, row)? {
                Some(v) => {
                    total = total.map(|t| t + recode.apply(v));
                }
                None => {
                    total = None;
                    break;
                }
            }
        }
        totals.push(total);
    }

    let mut fields: Vec<Field> = table
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.push(Field::new(out_col, DataType::Float64, true));

    let mut columns = table.columns().to_vec();
    columns.push(Arc::new(Float64Array::from(totals)));

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Int64Array};

    fn items_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int64, true),
            Field::new("b", DataType::Int64, true),
            Field::new("c", DataType::Int64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![Some(1), Some(2)])),
                Arc::new(Int64Array::from(vec![Some(2), None])),
                Arc::new(Int64Array::from(vec![Some(0), Some(3)])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_total_is_exact_sum() {
        let batch = items_batch();
        let scored = derive_total_score(
            &batch,
            "total",
            &[
                ("a", Recode::Identity),
                ("b", Recode::Identity),
                ("c", Recode::Identity),
            ],
        )
        .unwrap();
        let totals = tabular::f64_column(&scored, "total").unwrap();
        assert_eq!(totals.value(0), 3.0);
    }

    #[test]
    fn test_missing_component_makes_total_missing() {
        let batch = items_batch();
        let scored = derive_total_score(
            &batch,
            "total",
            &[
                ("a", Recode::Identity),
                ("b", Recode::Identity),
                ("c", Recode::Identity),
            ],
        )
        .unwrap();
        let totals = tabular::f64_column(&scored, "total").unwrap();
        assert!(totals.is_null(1));
    }

    #[test]
    fn test_recodes() {
        assert_eq!(Recode::FlipBinary.apply(0.0), 1.0);
        assert_eq!(Recode::FlipBinary.apply(1.0), 0.0);
        assert_eq!(Recode::Reverse { max: 4.0 }.apply(1.0), 3.0);
        assert_eq!(Recode::Reverse { max: 4.0 }.apply(3.0), 1.0);
    }

    #[test]
    fn test_flip_binary_in_sum() {
        let schema = Arc::new(Schema::new(vec![Field::new("flag", DataType::Int64, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from(vec![Some(0), Some(1), None]))],
        )
        .unwrap();
        let scored =
            derive_total_score(&batch, "flipped", &[("flag", Recode::FlipBinary)]).unwrap();
        let flipped = tabular::f64_column(&scored, "flipped").unwrap();
        assert_eq!(flipped.value(0), 1.0);
        assert_eq!(flipped.value(1), 0.0);
        assert!(flipped.is_null(2));
    }

    #[test]
    fn test_existing_output_column_rejected() {
        let batch = items_batch();
        let err = derive_total_score(&batch, "a", &[("b", Recode::Identity)]).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { column } if column == "a"));
    }
}
