//! Output module for run artifacts
//!
//! This module handles:
//! - Writing the harvested corpus as a JSON array
//! - Writing the finalized run statistics
//! - Aggregating and printing corpus statistics

pub mod stats;

pub use stats::{is_valid, print_statistics, FieldStats, IdTally, RunStats, StatsAggregator};

use crate::record::Record;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the statistics file inside the stats directory
pub const STATS_FILE_NAME: &str = "run_stats.json";

/// Writes the corpus to `{dir}/{unix_timestamp}_len{count}.json`
///
/// # Arguments
///
/// * `dir` - Results directory, created if missing
/// * `records` - The harvested records
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written file
/// * `Err(io::Error)` - The directory or file could not be written
pub fn write_corpus(dir: &Path, records: &[Record]) -> io::Result<PathBuf> {
    let file_name = format!(
        "{}_len{}.json",
        chrono::Utc::now().timestamp(),
        records.len()
    );
    write_json(dir, &file_name, records)
}

/// Writes the run statistics to `{dir}/run_stats.json`
pub fn write_stats(dir: &Path, stats: &RunStats) -> io::Result<PathBuf> {
    write_json(dir, STATS_FILE_NAME, stats)
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, file_name: &str, value: &T) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, json)?;
    tracing::info!("Wrote {}", path.display());
    Ok(path)
}
