//! Harvest coordinator - two-stage pipeline orchestration
//!
//! This module wires the stages of a run together:
//! - Building the link set (listing pages, or one id)
//! - Draining the link queue through a fixed pool of extraction workers
//! - Isolating each record so a fault drops only that record
//! - Folding the record stream into run statistics

use crate::config::{validate, Config, HarvestConfig, DEFAULT_CONFIG_HASH};
use crate::crawler::counters::RunCounters;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::listing::LinkHarvester;
use crate::extract::{ExtractionEngine, HandlerRegistry};
use crate::output::{RunStats, StatsAggregator};
use crate::record::{Link, Record};
use crate::HarvestError;
use chrono::Utc;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Highest numeric id the catalog's five-digit accession numbers can carry
pub const MAX_DRUG_ID: u32 = 99_999;

/// What a run harvests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestTarget {
    /// Every entry on listing pages `0..n`
    Pages(u32),

    /// The single entry with this numeric id
    Id(u32),
}

impl HarvestTarget {
    /// Checks the target against the configured limits
    pub fn validate(&self, config: &HarvestConfig) -> Result<(), String> {
        match *self {
            HarvestTarget::Pages(count) if count > config.max_pages => {
                Err(format!("Max page is {}, got {}", config.max_pages, count))
            }
            HarvestTarget::Id(id) if id > MAX_DRUG_ID => Err(format!(
                "Max id value is 5 digits, i.e. {}, got {}",
                MAX_DRUG_ID, id
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for HarvestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarvestTarget::Pages(count) => write!(f, "{} listing pages", count),
            HarvestTarget::Id(id) => write!(f, "drug {}", accession_number(*id)),
        }
    }
}

/// Result of a complete run
#[derive(Debug)]
pub struct HarvestRun {
    /// Records in arrival order
    pub records: Vec<Record>,
    pub stats: RunStats,
}

/// Formats a numeric id as an accession number, e.g. `DB00001`
pub fn accession_number(id: u32) -> String {
    format!("DB{:05}", id)
}

/// Main harvest coordinator
pub struct Harvester {
    config: Config,
    config_hash: String,
    counters: Arc<RunCounters>,
    listing: LinkHarvester,
    engine: Arc<ExtractionEngine>,
}

impl Harvester {
    /// Creates a harvester with the standard handler registry
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration; validated here
    /// * `counters` - Run counters every fetch reports into
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration or HTTP client setup failure
    pub fn new(config: Config, counters: Arc<RunCounters>) -> Result<Self, HarvestError> {
        Self::with_registry(config, counters, HandlerRegistry::standard())
    }

    /// Creates a harvester routing fields through `registry`
    pub fn with_registry(
        config: Config,
        counters: Arc<RunCounters>,
        registry: HandlerRegistry,
    ) -> Result<Self, HarvestError> {
        validate(&config)?;

        let fetcher = Arc::new(Fetcher::new(
            &config.fetcher,
            &config.site,
            Arc::clone(&counters),
        )?);
        let listing = LinkHarvester::new(
            Arc::clone(&fetcher),
            config.site.clone(),
            config.harvest.workers,
        )?;
        let engine = Arc::new(ExtractionEngine::new(
            registry,
            &config.site,
            &config.harvest,
            fetcher,
        ));

        Ok(Self {
            config,
            config_hash: DEFAULT_CONFIG_HASH.to_string(),
            counters,
            listing,
            engine,
        })
    }

    /// Records the hash of the configuration source in the run statistics
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    pub fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    /// Link to the detail page of one numeric id
    pub fn link_for_id(&self, id: u32) -> Link {
        let accession = accession_number(id);
        let url = self.config.site.drug_url(&accession);
        Link::new(accession, url)
    }

    /// Collects detail links from listing pages `0..page_count`
    pub async fn collect_links(&self, page_count: u32) -> Vec<Link> {
        self.listing.collect_links(page_count).await
    }

    /// Extracts every link on a fixed worker pool
    ///
    /// The returned channel is buffered to the link count, so no worker waits on the
    /// consumer. It closes once every worker has drained the queue.
    pub fn harvest(&self, links: Vec<Link>) -> mpsc::Receiver<Record> {
        let total = links.len();
        let (tx, rx) = mpsc::channel(total.max(1));
        let queue = Arc::new(Mutex::new(VecDeque::from(links)));
        let workers = self.config.harvest.workers.clamp(1, total.max(1));

        tracing::info!("Harvesting {} links with {} workers", total, workers);

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                let engine = Arc::clone(&self.engine);
                let tx = tx.clone();

                tokio::spawn(async move {
                    while let Some(link) = next_link(&queue) {
                        match extract_isolated(Arc::clone(&engine), link).await {
                            Ok(record) => {
                                if tx.send(record).await.is_err() {
                                    tracing::warn!("Result channel closed, worker {} stopping", worker);
                                    break;
                                }
                            }
                            Err(e @ HarvestError::RecordFault { .. }) => tracing::error!("{}", e),
                            Err(e) => tracing::warn!("Skipping record: {}", e),
                        }
                    }
                    tracing::debug!("Worker {} finished", worker);
                })
            })
            .collect();

        // Workers hold the only remaining senders
        drop(tx);

        tokio::spawn(async move {
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!("Harvest worker failed: {}", e);
                }
            }
            tracing::info!("All {} links processed", total);
        });

        rx
    }

    /// Runs a complete harvest and aggregates its statistics
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestRun)` - Every record that survived extraction, plus run statistics
    /// * `Err(HarvestError::InvalidTarget)` - The target exceeds the configured limits
    pub async fn run(&self, target: HarvestTarget) -> Result<HarvestRun, HarvestError> {
        target
            .validate(&self.config.harvest)
            .map_err(HarvestError::InvalidTarget)?;

        let started_at = Utc::now();
        tracing::info!("Starting harvest of {}", target);

        let links = match target {
            HarvestTarget::Pages(count) => self.collect_links(count).await,
            HarvestTarget::Id(id) => vec![self.link_for_id(id)],
        };
        let total = links.len();
        tracing::info!("Collected {} links", total);

        let mut results = self.harvest(links);
        let mut aggregator = StatsAggregator::new();
        let mut records = Vec::with_capacity(total);

        while let Some(record) = results.recv().await {
            aggregator.accumulate(&record);
            tracing::info!("Harvested {} ({}/{})", record.link, records.len() + 1, total);
            records.push(record);
        }

        let stats = aggregator.finalize(self.counters.snapshot(), &self.config_hash, started_at);
        tracing::info!(
            "Harvest completed: {} of {} records in {}s",
            records.len(),
            total,
            (stats.finished_at - started_at).num_seconds()
        );

        Ok(HarvestRun { records, stats })
    }
}

fn next_link(queue: &Mutex<VecDeque<Link>>) -> Option<Link> {
    queue.lock().ok()?.pop_front()
}

/// Runs one extraction in its own task so a panic is contained to that record
async fn extract_isolated(engine: Arc<ExtractionEngine>, link: Link) -> Result<Record, HarvestError> {
    let url = link.url.clone();
    let task = tokio::spawn(async move { engine.process(&link).await });

    match task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(HarvestError::RecordFault {
            url,
            message: format!("extraction panicked: {}", panic_message(e.into_panic())),
        }),
        Err(e) => Err(HarvestError::RecordFault {
            url,
            message: e.to_string(),
        }),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
