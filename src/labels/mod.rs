//! Human-readable display labels for variables.
//!
//! The label lookup is loaded from a two-column snapshot (`variable`,
//! `label`). Labels affect display strings in rendered tables only; they
//! never change computation, ordering or the numeric contract.

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::tabular;

/// Lookup from variable name to display label
#[derive(Debug, Clone, Default)]
pub struct VariableLabels {
    map: FxHashMap<String, String>,
}

impl VariableLabels {
    /// Create an empty lookup; every variable falls back to its raw name
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the lookup from a two-column table
    pub fn from_batch(batch: &RecordBatch, variable_col: &str, label_col: &str) -> Result<Self> {
        let variables = tabular::str_column(batch, variable_col)?;
        let labels = tabular::str_column(batch, label_col)?;
        let mut map = FxHashMap::default();
        for row in 0..batch.num_rows() {
            if variables.is_null(row) || labels.is_null(row) {
                continue;
            }
            map.insert(
                variables.value(row).to_string(),
                labels.value(row).to_string(),
            );
        }
        Ok(Self { map })
    }

    /// Register a single label
    pub fn insert(&mut self, variable: &str, label: &str) {
        self.map.insert(variable.to_string(), label.to_string());
    }

    /// Display label for a variable, falling back to the raw name
    #[must_use]
    pub fn label_for<'a>(&'a self, variable: &'a str) -> &'a str {
        self.map.get(variable).map_or(variable, String::as_str)
    }

    /// Number of known labels
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the lookup is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::StringArray;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_lookup_and_fallback() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("variable", DataType::Utf8, false),
            Field::new("label", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["ucla_isolated"])),
                Arc::new(StringArray::from(vec!["UCLA: feels isolated"])),
            ],
        )
        .unwrap();

        let labels = VariableLabels::from_batch(&batch, "variable", "label").unwrap();
        assert_eq!(labels.label_for("ucla_isolated"), "UCLA: feels isolated");
        assert_eq!(labels.label_for("unknown_var"), "unknown_var");
        assert_eq!(labels.len(), 1);
    }
}
