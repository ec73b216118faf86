//! End-to-end orchestration of the assembly, missingness and imputation
//! stages.
//!
//! Every stage takes its input tables as parameters and returns new tables;
//! there is no shared ambient workspace. Data flows strictly forward: raw
//! snapshots -> cohort table -> missingness reports (side output) ->
//! predictor table -> imputed ensemble.

use arrow::record_batch::RecordBatch;
use log::info;
use std::path::Path;

use crate::assemble::{
    Recode, SelectedObservations, collection_start, derive_total_score, first_observation,
    left_join, left_join_many,
};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::impute::{ChainedEquations, ImputationEngine};
use crate::labels::VariableLabels;
use crate::missing::{PatternTable, SummaryTable, missing_pattern, missing_summary};
use crate::store;
use crate::tabular;
use crate::variables::{
    ASSESSMENT_DATE, INVESTIGATION, PANEL, PERSON_ID, SELF_REPORT, SOCIODEMOGRAPHIC, UCLA_ITEMS,
    UCLA_TOTAL, VISIT_ID, imputation_columns,
};

/// Input snapshot file names under the configured input directory
pub mod inputs {
    /// Primary cohort table: general health with the UCLA items
    pub const GENERAL_HEALTH: &str = "general_health.parquet";
    /// Visit-to-person identity table
    pub const IDENTITY: &str = "identity.parquet";
    /// Sociodemographic measures
    pub const SOCIODEMOGRAPHIC: &str = "sociodemographic.parquet";
    /// Self-report questionnaire totals
    pub const SELF_REPORT: &str = "self_report.parquet";
    /// Administrative-investigation measures
    pub const INVESTIGATION: &str = "investigation.parquet";
    /// Panel-assessment measures
    pub const PANEL: &str = "panel.parquet";
    /// Variable-label lookup (two columns: variable, label)
    pub const VARIABLE_LABELS: &str = "variable_labels.parquet";
}

/// Pattern and summary tables for one measure group
#[derive(Debug)]
pub struct MeasureReport {
    /// Group name
    pub group: &'static str,
    /// Distinct missingness patterns
    pub pattern: PatternTable,
    /// Per-column missingness summary
    pub summary: SummaryTable,
}

/// What a completed run produced
#[derive(Debug)]
pub struct RunSummary {
    /// Rows in the assembled cohort (one per person)
    pub cohort_rows: usize,
    /// Persons dropped for lack of a qualifying observation
    pub dropped_persons: usize,
    /// Missingness reports per measure group
    pub reports: Vec<MeasureReport>,
    /// Rows in the persisted predictor table
    pub predictor_rows: usize,
    /// Completed datasets in the persisted ensemble
    pub ensemble_size: usize,
}

/// Assemble the cohort: one row per person at their first qualifying
/// UCLA assessment inside the collection window.
///
/// The window start is the instrument rollout date, derived once as the
/// earliest assessment with all three items observed; earlier visits are
/// out of the collection window, not missing data.
pub fn assemble_cohort(
    general_health: &RecordBatch,
    identity: &RecordBatch,
) -> Result<SelectedObservations> {
    let with_person = left_join(general_health, identity, VISIT_ID)?;
    let start = collection_start(&with_person, ASSESSMENT_DATE, UCLA_ITEMS)?.ok_or_else(|| {
        Error::NoCollectionWindow {
            instrument: "ucla".to_string(),
        }
    })?;
    info!("UCLA collection window starts {start}");
    first_observation(
        &with_person,
        PERSON_ID,
        VISIT_ID,
        ASSESSMENT_DATE,
        UCLA_ITEMS,
        start,
    )
}

/// Left-join the auxiliary measure tables onto the cohort and derive the
/// UCLA total score
pub fn attach_measures(
    cohort: &RecordBatch,
    sociodemographic: &RecordBatch,
    self_report: &RecordBatch,
    investigation: &RecordBatch,
    panel: &RecordBatch,
) -> Result<RecordBatch> {
    let joined = left_join_many(
        cohort,
        &[
            (sociodemographic, VISIT_ID),
            (self_report, VISIT_ID),
            (investigation, VISIT_ID),
            (panel, VISIT_ID),
        ],
    )?;
    let items: Vec<(&str, Recode)> = UCLA_ITEMS
        .iter()
        .map(|item| (*item, Recode::Identity))
        .collect();
    derive_total_score(&joined, UCLA_TOTAL, &items)
}

/// Compute the pattern and summary tables for every measure group
pub fn measure_reports(
    table: &RecordBatch,
    labels: &VariableLabels,
) -> Result<Vec<MeasureReport>> {
    let groups: [(&'static str, &[&str]); 5] = [
        ("ucla", UCLA_ITEMS),
        ("sociodemographic", SOCIODEMOGRAPHIC),
        ("self_report", SELF_REPORT),
        ("investigation", INVESTIGATION),
        ("panel", PANEL),
    ];

    groups
        .iter()
        .map(|(group, columns)| {
            let pattern = missing_pattern(table, columns, labels)?;
            let summary = missing_summary(table, columns, labels)?;
            info!(
                "{group}: {} pattern(s), {} complete case(s) of {} ({}%)",
                pattern.rows.len(),
                summary.complete_cases,
                summary.total_rows,
                summary.complete_percent
            );
            Ok(MeasureReport {
                group,
                pattern,
                summary,
            })
        })
        .collect()
}

/// Project the analysis table to the visit key plus the imputation columns
pub fn predictor_table(table: &RecordBatch) -> Result<RecordBatch> {
    let mut columns = vec![VISIT_ID];
    columns.extend(imputation_columns());
    tabular::project(table, &columns)
}

/// Run the full pipeline from input snapshots to persisted artifacts
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    info!("{config}");
    let load = |name: &str| store::read_table(&config.input_dir.join(name));

    let general_health = load(inputs::GENERAL_HEALTH)?;
    let identity = load(inputs::IDENTITY)?;
    let sociodemographic = load(inputs::SOCIODEMOGRAPHIC)?;
    let self_report = load(inputs::SELF_REPORT)?;
    let investigation = load(inputs::INVESTIGATION)?;
    let panel = load(inputs::PANEL)?;
    let labels = VariableLabels::from_batch(&load(inputs::VARIABLE_LABELS)?, "variable", "label")?;

    let cohort = assemble_cohort(&general_health, &identity)?;
    info!(
        "assembled cohort: {} person(s), {} dropped",
        cohort.table.num_rows(),
        cohort.dropped.len()
    );

    let analysis = attach_measures(
        &cohort.table,
        &sociodemographic,
        &self_report,
        &investigation,
        &panel,
    )?;

    let reports = measure_reports(&analysis, &labels)?;

    let predictors = predictor_table(&analysis)?;
    store::write_table(&predictors, &predictor_path(&config.output_dir))?;

    let columns = imputation_columns();
    let ensemble = ChainedEquations.impute(&predictors, &columns, &config.impute)?;
    store::write_ensemble(&ensemble, &ensemble_dir(&config.output_dir))?;

    Ok(RunSummary {
        cohort_rows: cohort.table.num_rows(),
        dropped_persons: cohort.dropped.len(),
        reports,
        predictor_rows: predictors.num_rows(),
        ensemble_size: ensemble.completed.len(),
    })
}

/// Path of the persisted predictor table under `output_dir`
#[must_use]
pub fn predictor_path(output_dir: &Path) -> std::path::PathBuf {
    output_dir.join("predictors.parquet")
}

/// Directory of the persisted ensemble under `output_dir`
#[must_use]
pub fn ensemble_dir(output_dir: &Path) -> std::path::PathBuf {
    output_dir.join("ensemble")
}
