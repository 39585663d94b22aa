// Multi-database attribution on a rayon pool

use super::engine::{attribute, Attribution};
use super::mode::AttributionMode;
use crate::cct::MetricId;
use crate::config::AnalyzerConfig;
use crate::ingest::ProfileDatabase;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

/// Load a database and pick its attribution metric
///
/// Metric selection is per database: databases may number their metrics
/// differently.
pub fn open_database(path: &Path, config: &AnalyzerConfig) -> Result<(ProfileDatabase, MetricId)> {
    let db = ProfileDatabase::open(path, &config.ingest_options())
        .with_context(|| format!("Failed to load profile database: {}", path.display()))?;

    let metric = match db.tables.metrics.select(&config.exclusive_tag) {
        Some(metric) => metric,
        None => anyhow::bail!("Database {} has no metrics", path.display()),
    };
    if let Some(entry) = db.tables.metrics.entry(metric) {
        info!(
            "{}: attributing metric '{}' (id {})",
            path.display(),
            entry.name,
            entry.raw_id
        );
    }
    Ok((db, metric))
}

/// Attribute one database end to end
pub fn attribute_database(
    path: &Path,
    mode: AttributionMode,
    config: &AnalyzerConfig,
) -> Result<Attribution> {
    let (db, metric) = open_database(path, config)?;
    attribute(&db, mode, &config.marker_frame, metric)
        .with_context(|| format!("Malformed calling-context tree in {}", path.display()))
}

/// Attribute every database and fold the results into one
///
/// Databases are loaded and aggregated in parallel, each worker owning its
/// tree. Partial results are reduced in argument order so the merged sums do
/// not depend on scheduling. The first failing database (in argument order)
/// aborts the run.
pub fn attribute_databases(
    paths: &[PathBuf],
    mode: AttributionMode,
    config: &AnalyzerConfig,
) -> Result<Attribution> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs.unwrap_or(0))
        .build()
        .context("Failed to build worker pool")?;

    info!(
        "Attributing {} database(s) in {} mode on {} worker(s)",
        paths.len(),
        mode,
        pool.current_num_threads()
    );

    let partials: Vec<Result<Attribution>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| attribute_database(path, mode, config))
            .collect()
    });

    let mut merged = Attribution::new(mode);
    for partial in partials {
        merged.merge(partial?);
    }
    Ok(merged)
}
