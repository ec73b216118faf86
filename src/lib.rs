//! Cohort assembly, missing-data characterization, and multiple imputation
//! for visit-keyed clinical study tables.
//!
//! The pipeline joins several survey/clinical snapshots around the UCLA
//! 3-Item Loneliness Scale, selects each person's first qualifying
//! assessment, characterizes missingness over named column groups, and
//! produces a deterministic multiply-imputed ensemble of the predictor
//! table.

pub mod assemble;
pub mod config;
pub mod error;
pub mod impute;
pub mod labels;
pub mod missing;
pub mod pipeline;
pub mod store;
pub mod tabular;
pub mod variables;

// Re-export the most common types for easier use
// Core types
pub use config::{ImputeOptions, PipelineConfig};
pub use error::{Error, Result};
pub use labels::VariableLabels;

// Assembly
pub use assemble::{
    Recode, SelectedObservations, collection_start, derive_total_score, first_observation,
    left_join, left_join_many,
};

// Missingness analysis
pub use missing::{PatternTable, SummaryTable, missing_pattern, missing_summary};

// Imputation
pub use impute::{ChainedEquations, Ensemble, EnsembleMeta, ImputationEngine};

// Arrow types
pub use arrow::datatypes::Schema as ArrowSchema;
pub use arrow::record_batch::RecordBatch;
