//! Crawler module for catalog fetching and harvest orchestration
//!
//! This module contains the networked half of the harvester, including:
//! - HTTP fetching with retry, disguised-failure detection and jittered pacing
//! - Run-wide counters shared by every concurrent fetch
//! - Listing-page link discovery
//! - Overall harvest coordination

mod coordinator;
pub mod counters;
pub mod fetcher;
mod listing;

pub use coordinator::{accession_number, HarvestRun, HarvestTarget, Harvester, MAX_DRUG_ID};
pub use counters::{CounterSnapshot, RunCounters};
pub use fetcher::{build_http_client, jitter, FetchedPage, Fetcher};
pub use listing::{parse_listing, LinkHarvester};

use crate::config::Config;
use crate::HarvestError;
use std::sync::Arc;

/// Runs a complete harvest with fresh counters
///
/// This is the main entry point for a harvest. It will:
/// 1. Validate the configuration and build the HTTP client
/// 2. Collect detail links for the target
/// 3. Extract every link on the worker pool
/// 4. Aggregate run statistics
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `target` - Listing pages or a single id
///
/// # Returns
///
/// * `Ok(HarvestRun)` - Records and statistics
/// * `Err(HarvestError)` - Invalid configuration or target
pub async fn harvest(config: Config, target: HarvestTarget) -> Result<HarvestRun, HarvestError> {
    Harvester::new(config, Arc::new(RunCounters::new()))?
        .run(target)
        .await
}
