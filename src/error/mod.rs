//! Error handling for the cohort assembly and imputation pipeline.
//!
//! All errors are fail-fast: a malformed intermediate table must never
//! propagate silently into the predictor artifact or the ensemble.

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::io;

/// Specialized error type for cohort assembly, missingness analysis and imputation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested column is absent from the table
    #[error("column '{column}' not found in table")]
    ColumnNotFound {
        /// Name of the missing column
        column: String,
    },

    /// A column exists but has an unexpected Arrow data type
    #[error("column '{column}' has type {actual}, expected {expected}")]
    ColumnType {
        /// Name of the offending column
        column: String,
        /// The type the caller required
        expected: String,
        /// The type actually present
        actual: String,
    },

    /// An auxiliary join table contains duplicate keys (ambiguous left join)
    #[error("ambiguous join: key '{key}' occurs {count} times in auxiliary table")]
    AmbiguousJoin {
        /// The duplicated key value
        key: String,
        /// How many times it occurs
        count: usize,
    },

    /// A joined table would introduce a column name already present in the base
    #[error("duplicate column '{column}' when joining tables")]
    DuplicateColumn {
        /// The colliding column name
        column: String,
    },

    /// A person has no observation meeting the first-observation criteria
    #[error("person '{person}' has no qualifying observation")]
    EmptyQualifyingGroup {
        /// The person-level identifier
        person: String,
    },

    /// No fully observed row exists to derive the collection window start
    #[error("no fully observed row to derive the collection start for '{instrument}'")]
    NoCollectionWindow {
        /// Name of the instrument whose rollout date was requested
        instrument: String,
    },

    /// Error inside the imputation engine
    #[error("imputation error: {0}")]
    Imputation(String),

    /// Error from the Arrow compute kernels or batch construction
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error reading or writing Parquet artifacts
    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error reading or writing ensemble metadata
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Error opening or reading a file
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
