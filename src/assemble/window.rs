//! Collection-window derivation and first-observation selection.

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::tabular;

/// Result of first-observation selection: one row per qualifying person,
/// plus the person identifiers that had no qualifying observation.
#[derive(Debug)]
pub struct SelectedObservations {
    /// One row per person, input row order preserved
    pub table: RecordBatch,
    /// Persons present in the input with no qualifying row, sorted
    pub dropped: Vec<String>,
}

/// Derive the collection start of an instrument: the earliest assessment
/// date among rows fully observed on `target_cols`.
///
/// This models the instrument rollout date. Rows before it are outside the
/// collection window, not missing data. Returns `None` when no row is
/// fully observed.
pub fn collection_start(
    table: &RecordBatch,
    time_key: &str,
    target_cols: &[&str],
) -> Result<Option<NaiveDate>> {
    let dates = tabular::date32_column(table, time_key)?;
    let masks = target_cols
        .iter()
        .map(|c| tabular::null_mask(table, c))
        .collect::<Result<Vec<_>>>()?;

    let mut start: Option<NaiveDate> = None;
    for row in 0..table.num_rows() {
        if masks.iter().any(|m| m[row]) {
            continue;
        }
        let Some(date) = tabular::date_value(dates, row) else {
            continue;
        };
        start = Some(match start {
            Some(best) if best <= date => best,
            _ => date,
        });
    }
    Ok(start)
}

/// Select each person's first chronological observation at or after `start`
/// with all `required_cols` observed.
///
/// Rows before `start` are excluded from consideration entirely. Within a
/// person, rows are ordered by assessment date ascending with the visit
/// identifier as a deterministic tie-break. Persons with no qualifying row
/// are dropped and reported in [`SelectedObservations::dropped`].
///
/// The operation is idempotent: re-running it on its own output returns the
/// same table.
pub fn first_observation(
    table: &RecordBatch,
    person_key: &str,
    visit_key: &str,
    time_key: &str,
    required_cols: &[&str],
    start: NaiveDate,
) -> Result<SelectedObservations> {
    let persons = tabular::str_column(table, person_key)?;
    let visits = tabular::str_column(table, visit_key)?;
    let dates = tabular::date32_column(table, time_key)?;
    let masks = required_cols
        .iter()
        .map(|c| tabular::null_mask(table, c))
        .collect::<Result<Vec<_>>>()?;

    // person -> (date, visit, row) of the best qualifying observation
    let mut best: FxHashMap<&str, (NaiveDate, &str, usize)> = FxHashMap::default();
    let mut seen: FxHashSet<&str> = FxHashSet::default();

    for row in 0..table.num_rows() {
        if persons.is_null(row) {
            continue;
        }
        let person = persons.value(row);
        seen.insert(person);
        let Some(date) = tabular::date_value(dates, row) else {
            continue;
        };
        if date < start {
            // out of the collection window, not a missing observation
            continue;
        }
        if masks.iter().any(|m| m[row]) || visits.is_null(row) {
            continue;
        }
        let visit = visits.value(row);
        let replaces = match best.get(person) {
            Some(&(d, v, _)) => (date, visit) < (d, v),
            None => true,
        };
        if replaces {
            best.insert(person, (date, visit, row));
        }
    }

    let mut indices: Vec<usize> = best.values().map(|&(_, _, row)| row).collect();
    indices.sort_unstable();

    let mut dropped: Vec<String> = seen
        .iter()
        .filter(|p| !best.contains_key(*p))
        .map(|p| (*p).to_string())
        .collect();
    dropped.sort();

    if !dropped.is_empty() {
        warn!(
            "{} person(s) had no qualifying observation and were dropped",
            dropped.len()
        );
    }

    Ok(SelectedObservations {
        table: tabular::take_rows(table, &indices)?,
        dropped,
    })
}

/// Strict variant of [`first_observation`]: surfaces
/// [`Error::EmptyQualifyingGroup`] for the first person (in sorted order)
/// with no qualifying observation instead of dropping.
pub fn first_observation_strict(
    table: &RecordBatch,
    person_key: &str,
    visit_key: &str,
    time_key: &str,
    required_cols: &[&str],
    start: NaiveDate,
) -> Result<RecordBatch> {
    let selected = first_observation(table, person_key, visit_key, time_key, required_cols, start)?;
    if let Some(person) = selected.dropped.first() {
        return Err(Error::EmptyQualifyingGroup {
            person: person.clone(),
        });
    }
    Ok(selected.table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days(y: i32, m: u32, d: u32) -> i32 {
        crate::tabular::date_to_days(date(y, m, d))
    }

    fn visits_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("person_id", DataType::Utf8, false),
            Field::new("visit_id", DataType::Utf8, false),
            Field::new("assessment_date", DataType::Date32, true),
            Field::new("item", DataType::Float64, true),
        ]));
        // p1: pre-window complete row, then two in-window rows (first missing)
        // p2: one complete in-window row
        // p3: only a missing in-window row -> dropped
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["p1", "p1", "p1", "p2", "p3"])),
                Arc::new(StringArray::from(vec!["v1", "v2", "v3", "v4", "v5"])),
                Arc::new(Date32Array::from(vec![
                    Some(days(2018, 1, 10)),
                    Some(days(2019, 3, 1)),
                    Some(days(2019, 6, 1)),
                    Some(days(2019, 4, 2)),
                    Some(days(2019, 5, 5)),
                ])),
                Arc::new(Float64Array::from(vec![
                    Some(1.0),
                    None,
                    Some(2.0),
                    Some(3.0),
                    None,
                ])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_collection_start_is_min_complete_date() {
        let batch = visits_batch();
        let start = collection_start(&batch, "assessment_date", &["item"]).unwrap();
        assert_eq!(start, Some(date(2018, 1, 10)));
    }

    #[test]
    fn test_collection_start_none_without_complete_rows() {
        let batch = visits_batch();
        let empty = batch.slice(1, 1); // only the missing-item row
        let start = collection_start(&empty, "assessment_date", &["item"]).unwrap();
        assert_eq!(start, None);
    }

    #[test]
    fn test_first_observation_respects_window() {
        let batch = visits_batch();
        let selected = first_observation(
            &batch,
            "person_id",
            "visit_id",
            "assessment_date",
            &["item"],
            date(2019, 1, 1),
        )
        .unwrap();

        // p1's 2018 row is out of window; its first in-window complete row is v3
        let visits = crate::tabular::str_column(&selected.table, "visit_id").unwrap();
        assert_eq!(selected.table.num_rows(), 2);
        assert_eq!(visits.value(0), "v3");
        assert_eq!(visits.value(1), "v4");
        assert_eq!(selected.dropped, vec!["p3".to_string()]);
    }

    #[test]
    fn test_first_observation_idempotent() {
        let batch = visits_batch();
        let start = date(2019, 1, 1);
        let once = first_observation(
            &batch,
            "person_id",
            "visit_id",
            "assessment_date",
            &["item"],
            start,
        )
        .unwrap();
        let twice = first_observation(
            &once.table,
            "person_id",
            "visit_id",
            "assessment_date",
            &["item"],
            start,
        )
        .unwrap();
        assert_eq!(once.table, twice.table);
        assert!(twice.dropped.is_empty());
    }

    #[test]
    fn test_strict_surfaces_empty_group() {
        let batch = visits_batch();
        let err = first_observation_strict(
            &batch,
            "person_id",
            "visit_id",
            "assessment_date",
            &["item"],
            date(2019, 1, 1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyQualifyingGroup { person } if person == "p3"));
    }
}
