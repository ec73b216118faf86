//! Persistence of pipeline artifacts.
//!
//! The pre-imputation predictor table and the imputed ensemble are two
//! independently addressable artifacts: a single Parquet snapshot, and a
//! directory of per-copy Parquet files alongside a JSON metadata record.

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::impute::{Ensemble, EnsembleMeta};

const META_FILE: &str = "meta.json";

/// Write a table as a single Parquet snapshot
pub fn write_table(batch: &RecordBatch, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    info!("wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}

/// Read a Parquet snapshot back into a single record batch
pub fn read_table(path: &Path) -> Result<RecordBatch> {
    let file = fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Persist an ensemble: one Parquet file per completed copy plus metadata
pub fn write_ensemble(ensemble: &Ensemble, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for (i, copy) in ensemble.completed.iter().enumerate() {
        write_table(copy, &dir.join(copy_file_name(i)))?;
    }
    let meta = serde_json::to_string_pretty(&ensemble.meta)?;
    fs::write(dir.join(META_FILE), meta)?;
    info!(
        "wrote ensemble of {} completed dataset(s) to {}",
        ensemble.completed.len(),
        dir.display()
    );
    Ok(())
}

/// Restore an ensemble written by [`write_ensemble`]
pub fn read_ensemble(dir: &Path) -> Result<Ensemble> {
    let meta: EnsembleMeta = serde_json::from_str(&fs::read_to_string(dir.join(META_FILE))?)?;
    let completed = (0..meta.m)
        .map(|i| {
            let path = dir.join(copy_file_name(i));
            if !path.is_file() {
                return Err(Error::Imputation(format!(
                    "ensemble copy missing: {}",
                    path.display()
                )));
            }
            read_table(&path)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Ensemble { completed, meta })
}

fn copy_file_name(index: usize) -> String {
    format!("imp_{:03}.parquet", index + 1)
}
