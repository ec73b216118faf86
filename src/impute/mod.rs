//! Multiple imputation over the predictor table.
//!
//! The chained-equations algorithm sits behind the [`ImputationEngine`]
//! trait so it stays a swappable capability; this module owns the ensemble
//! types and the deterministic-seeding contract.

pub mod engine;

pub use engine::ChainedEquations;

use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::config::ImputeOptions;
use crate::error::Result;

/// Metadata describing how an ensemble was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleMeta {
    /// Number of completed datasets
    pub m: usize,
    /// Seed of the per-run random streams
    pub seed: u64,
    /// Maximum chained-equation sweeps per run
    pub max_iterations: usize,
}

/// M independently completed copies of the predictor table
#[derive(Debug)]
pub struct Ensemble {
    /// The completed datasets, identical schema and row count to the input
    pub completed: Vec<RecordBatch>,
    /// Run metadata
    pub meta: EnsembleMeta,
}

/// A multiple-imputation algorithm.
///
/// Implementations must be deterministic: identical `table`, `columns` and
/// options reproduce the ensemble bit-for-bit, regardless of thread count
/// or execution order.
pub trait ImputationEngine {
    /// Produce `opts.m` completed copies of `table`, imputing nulls in
    /// `columns`
    fn impute(
        &self,
        table: &RecordBatch,
        columns: &[&str],
        opts: &ImputeOptions,
    ) -> Result<Ensemble>;
}
