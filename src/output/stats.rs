//! Corpus statistics
//!
//! This module folds the record stream into per-field profiles, duplicate and
//! validity tallies, and carries the fetch counters over into the final report.

use crate::crawler::CounterSnapshot;
use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A record with this many set attributes or fewer is never valid
const MIN_SET_ATTRIBUTES: usize = 4;

/// Scalars a complete record is expected to carry
const EXPECTED_SCALARS: [&str; 12] = [
    "id",
    "molecule",
    "cas",
    "iupac_name",
    "background",
    "summary",
    "formula",
    "description",
    "link",
    "type",
    "indication",
    "pharmacodynamics",
];

/// Per-field profile of the corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStats {
    /// Records setting each field
    pub field_counts: BTreeMap<String, u64>,

    /// Mean text length of each scalar field over the records setting it
    pub average_field_lengths: BTreeMap<String, u64>,

    /// Share of records setting each field, e.g. `"40.00%"`
    pub field_completeness: BTreeMap<String, String>,

    pub total_stubs: u64,
    pub total_records: u64,
}

/// A set of ids with a running total
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTally {
    pub set: BTreeMap<String, bool>,
    pub total: u64,
}

/// Finalized run statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub stats: FieldStats,

    /// Every seen id, mapped to whether it occurred more than once
    pub duplicate_entries: IdTally,

    /// Ids of valid records; the total counts records, not ids
    pub valid_records: IdTally,

    pub num_requests: u64,
    pub num_retries: u64,
    pub num_sleeps: u64,
    pub num_errors: u64,
    pub slept_ms: u64,
    pub rate_limit_failures: Vec<String>,
    pub num_rate_limit_failures: usize,
    pub error_log: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: String,
}

/// Whether a record is complete enough to be useful
///
/// Required composites must be present. Missing expected scalars only produce a
/// diagnostic.
pub fn is_valid(record: &Record) -> bool {
    if record.set_attribute_count() <= MIN_SET_ATTRIBUTES {
        return false;
    }

    if record.synonyms.is_empty()
        || record.weight.is_empty()
        || record.moa.is_empty()
        || record.categories.is_empty()
    {
        return false;
    }

    if !record.inchi.is_complete() {
        return false;
    }

    let scalars = record.scalars();
    let missing_expected = scalars
        .iter()
        .any(|(name, value)| value.is_empty() && EXPECTED_SCALARS.contains(name));
    if missing_expected {
        let blanks = scalars.iter().filter(|(_, value)| value.is_empty()).count();
        tracing::debug!("{} is valid with {} blank scalar fields", record.id, blanks);
    }

    true
}

/// Accumulates statistics one record at a time
#[derive(Debug, Default)]
pub struct StatsAggregator {
    total_records: u64,
    total_stubs: u64,
    field_counts: BTreeMap<&'static str, u64>,
    field_lengths: BTreeMap<&'static str, u64>,
    occurrences: HashMap<String, u64>,
    valid_ids: BTreeMap<String, bool>,
    valid_total: u64,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one record into the running totals
    pub fn accumulate(&mut self, record: &Record) {
        self.total_records += 1;
        if record.is_stub {
            self.total_stubs += 1;
        }

        for field in record.profile() {
            let count = self.field_counts.entry(field.name).or_insert(0);
            if let Some(len) = field.text_len {
                let total_len = self.field_lengths.entry(field.name).or_insert(0);
                if field.is_set {
                    *total_len += len as u64;
                }
            }
            if field.is_set {
                *count += 1;
            }
        }

        if !record.id.is_empty() {
            *self.occurrences.entry(record.id.clone()).or_insert(0) += 1;
        }

        if is_valid(record) {
            self.valid_total += 1;
            self.valid_ids.insert(record.id.clone(), true);
        }
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    /// Computes averages and percentages and attaches the fetch counters
    pub fn finalize(
        self,
        counters: CounterSnapshot,
        config_hash: &str,
        started_at: DateTime<Utc>,
    ) -> RunStats {
        let total = self.total_records;

        let average_field_lengths = self
            .field_lengths
            .iter()
            .map(|(name, total_len)| {
                let count = self.field_counts.get(name).copied().unwrap_or(0);
                let average = if count == 0 { 0 } else { total_len / count };
                (name.to_string(), average)
            })
            .collect();

        let field_completeness = self
            .field_counts
            .iter()
            .map(|(name, count)| (name.to_string(), completeness(*count, total)))
            .collect();

        let field_counts = self
            .field_counts
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect();

        let duplicates: BTreeMap<String, bool> = self
            .occurrences
            .into_iter()
            .map(|(id, count)| (id, count > 1))
            .collect();
        let duplicate_total = duplicates.values().filter(|duplicated| **duplicated).count() as u64;

        RunStats {
            stats: FieldStats {
                field_counts,
                average_field_lengths,
                field_completeness,
                total_stubs: self.total_stubs,
                total_records: total,
            },
            duplicate_entries: IdTally {
                set: duplicates,
                total: duplicate_total,
            },
            valid_records: IdTally {
                set: self.valid_ids,
                total: self.valid_total,
            },
            num_requests: counters.requests,
            num_retries: counters.retries,
            num_sleeps: counters.sleeps,
            num_errors: counters.errors,
            slept_ms: counters.slept_ms,
            num_rate_limit_failures: counters.rate_limit_failures.len(),
            rate_limit_failures: counters.rate_limit_failures,
            error_log: counters.error_log,
            started_at,
            finished_at: Utc::now(),
            config_hash: config_hash.to_string(),
        }
    }
}

fn completeness(count: u64, total: u64) -> String {
    let percentage = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    };
    format!("{:.2}%", percentage)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStats) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Records harvested: {}", stats.stats.total_records);
    println!("  Stubs: {}", stats.stats.total_stubs);
    println!("  Duplicate ids: {}", stats.duplicate_entries.total);
    println!("  Valid records: {}", stats.valid_records.total);
    println!(
        "  Duration: {}s",
        (stats.finished_at - stats.started_at).num_seconds()
    );
    println!();

    println!("Field Completeness:");
    // Sort fields by count (descending)
    let mut field_counts: Vec<_> = stats.stats.field_counts.iter().collect();
    field_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (name, count) in field_counts {
        let completeness = stats
            .stats
            .field_completeness
            .get(name)
            .map(String::as_str)
            .unwrap_or("0.00%");
        match stats.stats.average_field_lengths.get(name) {
            Some(average) => println!("  {}: {} ({}, avg {} chars)", name, count, completeness, average),
            None => println!("  {}: {} ({})", name, count, completeness),
        }
    }
    println!();

    println!("Requests:");
    println!("  Issued: {}", stats.num_requests);
    println!("  Retries: {}", stats.num_retries);
    println!("  Sleeps: {} ({:.1}s)", stats.num_sleeps, stats.slept_ms as f64 / 1000.0);
    println!("  Errors: {}", stats.num_errors);
    println!();

    if !stats.rate_limit_failures.is_empty() {
        println!("Rate Limit Failures ({}):", stats.num_rate_limit_failures);
        for url in &stats.rate_limit_failures {
            println!("  - {}", url);
        }
        println!();
    }
}
