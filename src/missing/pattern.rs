//! Missingness-pattern enumeration.

use arrow::array::{Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use smallvec::SmallVec;
use std::sync::Arc;

use crate::error::Result;
use crate::labels::VariableLabels;
use crate::missing::percentage;
use crate::tabular;

/// Per-row missingness flags over a fixed column set (`true` = missing)
pub type PatternFlags = SmallVec<[bool; 8]>;

/// One distinct missingness pattern with its occurrence count
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRow {
    /// Missingness flag per column, in the supplied column order
    pub flags: PatternFlags,
    /// Number of rows exhibiting this pattern
    pub count: usize,
    /// Count as a percentage of the table's total row count
    pub percent: f64,
}

/// All distinct missingness patterns of a table over a column set
#[derive(Debug, Clone)]
pub struct PatternTable {
    /// Column names, in the order supplied by the caller
    pub columns: Vec<String>,
    /// Display labels, parallel to `columns`
    pub labels: Vec<String>,
    /// Patterns ordered by descending count, ties by lexicographic flags
    /// (all-observed first)
    pub rows: Vec<PatternRow>,
    /// Row count of the analyzed table
    pub total_rows: usize,
}

impl PatternTable {
    /// Count of rows with the all-observed pattern, zero if absent
    #[must_use]
    pub fn complete_case_count(&self) -> usize {
        self.rows
            .iter()
            .find(|r| r.flags.iter().all(|&missing| !missing))
            .map_or(0, |r| r.count)
    }

    /// Render as a record batch: one `Utf8` column per variable (labelled,
    /// values `observed`/`missing`), plus count and percentage columns
    pub fn to_batch(&self) -> Result<RecordBatch> {
        let mut fields: Vec<Field> = self
            .labels
            .iter()
            .map(|label| Field::new(label, DataType::Utf8, false))
            .collect();
        fields.push(Field::new("n", DataType::UInt64, false));
        fields.push(Field::new("percent", DataType::Float64, false));

        let mut columns: Vec<arrow::array::ArrayRef> = Vec::with_capacity(fields.len());
        for col in 0..self.columns.len() {
            let status: Vec<&str> = self
                .rows
                .iter()
                .map(|r| if r.flags[col] { "missing" } else { "observed" })
                .collect();
            columns.push(Arc::new(StringArray::from(status)));
        }
        columns.push(Arc::new(UInt64Array::from(
            self.rows.iter().map(|r| r.count as u64).collect::<Vec<_>>(),
        )));
        columns.push(Arc::new(Float64Array::from(
            self.rows.iter().map(|r| r.percent).collect::<Vec<_>>(),
        )));

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }
}

/// Enumerate the distinct observed/missing combinations of `columns`.
///
/// Rows are partitioned by their missingness vector; pattern counts sum to
/// the table's row count. Ordering is deterministic: descending count, ties
/// broken by lexicographic flag order so the all-observed pattern leads.
/// `labels` affects display names only.
pub fn missing_pattern(
    table: &RecordBatch,
    columns: &[&str],
    labels: &VariableLabels,
) -> Result<PatternTable> {
    let masks = columns
        .iter()
        .map(|c| tabular::null_mask(table, c))
        .collect::<Result<Vec<_>>>()?;
    let total_rows = table.num_rows();

    let mut rows: Vec<PatternRow> = (0..total_rows)
        .map(|row| masks.iter().map(|m| m[row]).collect::<PatternFlags>())
        .counts()
        .into_iter()
        .map(|(flags, count)| PatternRow {
            flags,
            count,
            percent: percentage(count, total_rows),
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.flags.cmp(&b.flags)));

    Ok(PatternTable {
        columns: columns.iter().map(|c| (*c).to_string()).collect(),
        labels: columns
            .iter()
            .map(|c| labels.label_for(c).to_string())
            .collect(),
        rows,
        total_rows,
    })
}
