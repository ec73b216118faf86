//! Key-preserving left joins of auxiliary measure tables.

use arrow::array::Array;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::tabular;

/// Left-join `aux` onto `base` by the `key` column.
///
/// The base row count and order are preserved; base rows without a match
/// receive nulls in the auxiliary columns. Duplicate keys in `aux` are an
/// ambiguous join and surface as [`Error::AmbiguousJoin`] rather than
/// fanning out rows. The key column itself is not duplicated in the output.
pub fn left_join(base: &RecordBatch, aux: &RecordBatch, key: &str) -> Result<RecordBatch> {
    let base_keys = tabular::str_column(base, key)?;
    let aux_keys = tabular::str_column(aux, key)?;

    // Index the auxiliary table by key, rejecting duplicates.
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for row in 0..aux.num_rows() {
        if aux_keys.is_null(row) {
            continue;
        }
        let k = aux_keys.value(row);
        let n = counts.entry(k).or_insert(0);
        *n += 1;
        if *n > 1 {
            return Err(Error::AmbiguousJoin {
                key: k.to_string(),
                count: *n,
            });
        }
        index.insert(k, row);
    }

    // Columns carried over from the auxiliary table, key excluded.
    let aux_schema = aux.schema();
    let mut carried: Vec<&str> = Vec::new();
    for field in aux_schema.fields() {
        let name = field.name().as_str();
        if name == key {
            continue;
        }
        if base.schema().index_of(name).is_ok() {
            return Err(Error::DuplicateColumn {
                column: name.to_string(),
            });
        }
        carried.push(name);
    }

    let indices: Vec<Option<usize>> = (0..base.num_rows())
        .map(|row| {
            if base_keys.is_null(row) {
                None
            } else {
                index.get(base_keys.value(row)).copied()
            }
        })
        .collect();

    let aux_projected = tabular::project(aux, &carried)?;
    let aux_taken = tabular::take_rows_nullable(&aux_projected, &indices)?;

    let mut fields: Vec<Field> = base
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.extend(
        aux_taken
            .schema()
            .fields()
            .iter()
            .map(|f| f.as_ref().clone()),
    );

    let mut columns = base.columns().to_vec();
    columns.extend(aux_taken.columns().iter().cloned());

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}

/// Sequentially left-join several auxiliary tables onto `base`
pub fn left_join_many(base: &RecordBatch, auxiliaries: &[(&RecordBatch, &str)]) -> Result<RecordBatch> {
    let mut joined = base.clone();
    for (aux, key) in auxiliaries {
        joined = left_join(&joined, aux, key)?;
    }
    Ok(joined)
}
