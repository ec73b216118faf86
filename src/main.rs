use anyhow::Context;
use cohort_mice::config::PipelineConfig;
use cohort_mice::pipeline;
use log::{info, warn};
use std::path::Path;
use std::time::Instant;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::default();
    if !Path::new(&config.input_dir).exists() {
        warn!("Input directory not found: {}", config.input_dir.display());
        return Ok(());
    }

    let start = Instant::now();
    let summary = pipeline::run(&config).context("pipeline run failed")?;

    info!(
        "Assembled {} person(s) ({} dropped), persisted {} predictor row(s)",
        summary.cohort_rows, summary.dropped_persons, summary.predictor_rows
    );
    for report in &summary.reports {
        info!(
            "{}: {} distinct missingness pattern(s)",
            report.group,
            report.pattern.rows.len()
        );
    }
    info!(
        "Imputed ensemble of {} completed dataset(s) in {:?}",
        summary.ensemble_size,
        start.elapsed()
    );

    Ok(())
}
