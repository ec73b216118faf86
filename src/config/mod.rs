//! Configuration for the assembly and imputation pipeline.

use std::fmt;
use std::path::PathBuf;

/// Options controlling a multiple-imputation run
#[derive(Debug, Clone)]
pub struct ImputeOptions {
    /// Number of completed datasets to produce
    pub m: usize,
    /// Seed for the per-run random streams; identical inputs and seed
    /// reproduce the ensemble bit-for-bit
    pub seed: u64,
    /// Maximum chained-equation sweeps per run
    pub max_iterations: usize,
    /// Donor pool size for predictive mean matching
    pub donors: usize,
}

impl Default for ImputeOptions {
    fn default() -> Self {
        Self {
            m: 20,
            seed: 20_240_117,
            max_iterations: 10,
            donors: 5,
        }
    }
}

/// Configuration for a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory containing the input table snapshots
    pub input_dir: PathBuf,
    /// Directory receiving the predictor table and the ensemble
    pub output_dir: PathBuf,
    /// Imputation options
    pub impute: ImputeOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            impute: ImputeOptions::default(),
        }
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Configuration:")?;
        writeln!(f, "  Input Directory: {}", self.input_dir.display())?;
        writeln!(f, "  Output Directory: {}", self.output_dir.display())?;
        writeln!(f, "  Imputations (m): {}", self.impute.m)?;
        writeln!(f, "  Seed: {}", self.impute.seed)?;
        writeln!(f, "  Max Iterations: {}", self.impute.max_iterations)?;
        Ok(())
    }
}
