//! Per-column missingness summaries.

use arrow::array::{Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::error::Result;
use crate::labels::VariableLabels;
use crate::missing::percentage;
use crate::tabular;

/// Missingness of a single column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    /// Raw column name
    pub column: String,
    /// Display label
    pub label: String,
    /// Number of missing rows
    pub missing: usize,
    /// Missing rows as a percentage of the table's total row count
    pub percent: f64,
}

/// Per-column missingness plus complete-case statistics
#[derive(Debug, Clone)]
pub struct SummaryTable {
    /// One entry per requested column, in the caller-supplied order
    pub columns: Vec<ColumnSummary>,
    /// Rows with no missing value among the requested columns
    pub complete_cases: usize,
    /// Complete cases as a percentage of the total row count
    pub complete_percent: f64,
    /// Row count of the analyzed table
    pub total_rows: usize,
}

impl SummaryTable {
    /// Render as a record batch with a trailing complete-cases row
    pub fn to_batch(&self) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("variable", DataType::Utf8, false),
            Field::new("n", DataType::UInt64, false),
            Field::new("percent", DataType::Float64, false),
        ]));

        let mut names: Vec<&str> = self.columns.iter().map(|c| c.label.as_str()).collect();
        names.push("complete cases");
        let mut counts: Vec<u64> = self.columns.iter().map(|c| c.missing as u64).collect();
        counts.push(self.complete_cases as u64);
        let mut percents: Vec<f64> = self.columns.iter().map(|c| c.percent).collect();
        percents.push(self.complete_percent);

        Ok(RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(names)),
                Arc::new(UInt64Array::from(counts)),
                Arc::new(Float64Array::from(percents)),
            ],
        )?)
    }
}

/// Summarize missingness per column plus the complete-case count.
///
/// Columns appear in the order supplied by the caller; the percentage
/// denominator is always the table's total row count. A single-column
/// invocation is valid. An empty table yields zero counts, not an error.
pub fn missing_summary(
    table: &RecordBatch,
    columns: &[&str],
    labels: &VariableLabels,
) -> Result<SummaryTable> {
    let masks = columns
        .iter()
        .map(|c| tabular::null_mask(table, c))
        .collect::<Result<Vec<_>>>()?;
    let total_rows = table.num_rows();

    let summaries: Vec<ColumnSummary> = columns
        .iter()
        .zip(&masks)
        .map(|(column, mask)| {
            let missing = mask.iter().filter(|&&m| m).count();
            ColumnSummary {
                column: (*column).to_string(),
                label: labels.label_for(column).to_string(),
                missing,
                percent: percentage(missing, total_rows),
            }
        })
        .collect();

    let complete_cases = (0..total_rows)
        .filter(|&row| masks.iter().all(|m| !m[row]))
        .count();

    Ok(SummaryTable {
        columns: summaries,
        complete_cases,
        complete_percent: percentage(complete_cases, total_rows),
        total_rows,
    })
}
