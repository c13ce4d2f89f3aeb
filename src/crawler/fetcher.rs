//! HTTP fetcher implementation
//!
//! This module handles every request the harvester makes, including:
//! - Building the HTTP client
//! - Classifying disguised failures (block and not-found pages served with HTTP 200)
//! - Retrying with randomized recovery sleeps
//! - Rate limiting with a randomized sleep after each success
//! - Parsing the body and stripping tracking links when a document is wanted

use crate::config::{FetcherConfig, SiteConfig};
use crate::crawler::counters::RunCounters;
use crate::document::Document;
use crate::FetchError;
use rand::Rng;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Body of a successful fetch, parsed when requested
#[derive(Debug)]
pub struct FetchedPage {
    pub body: String,
    pub document: Option<Document>,
}

/// Builds an HTTP client with the configured identity and timeouts
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Draws a uniformly random duration from `[low, high)`
///
/// Returns `low` when the interval is empty.
pub fn jitter((low, high): (Duration, Duration)) -> Duration {
    let low_ms = u64::try_from(low.as_millis()).unwrap_or(u64::MAX);
    let high_ms = u64::try_from(high.as_millis()).unwrap_or(u64::MAX);
    if high_ms <= low_ms {
        return low;
    }
    Duration::from_millis(rand::rng().random_range(low_ms..high_ms))
}

/// Retrying, self-throttling fetcher shared by every harvesting task
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Transport error | Retry after recovery sleep |
/// | Non-2xx status | Retry after recovery sleep |
/// | Body contains block signature | Retry after recovery sleep |
/// | Body contains not-found signature | Retry after recovery sleep |
/// | Empty or unparseable body when a document is wanted | Retry after recovery sleep |
/// | Attempts exhausted | URL recorded as rate-limit failure, `Exhausted` returned |
///
/// Recovery sleeps are drawn from `[base-delay, error-delay)`; the rate-limiting sleep
/// after a success is drawn from `[0, base-delay)`.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
    block_signature: String,
    not_found_signature: String,
    tracking_link_selector: String,
    counters: Arc<RunCounters>,
}

impl Fetcher {
    /// Creates a fetcher reporting into `counters`
    pub fn new(
        config: &FetcherConfig,
        site: &SiteConfig,
        counters: Arc<RunCounters>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            config: config.clone(),
            block_signature: site.block_signature.to_ascii_lowercase(),
            not_found_signature: site.not_found_signature.to_ascii_lowercase(),
            tracking_link_selector: site.tracking_link_selector.clone(),
            counters,
        })
    }

    pub fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    /// Fetches `url`, retrying transient failures
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `want_document` - Whether to parse the body into a [`Document`]
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - The raw body, plus the cleaned document when requested
    /// * `Err(FetchError::Exhausted)` - Every attempt failed; do not retry
    pub async fn fetch(&self, url: &str, want_document: bool) -> Result<FetchedPage, FetchError> {
        self.counters.record_request();
        let limit = self.config.retry_limit.max(1);

        for attempt in 1..=limit {
            // The document must not live across an await
            let error = match self.attempt(url, want_document).await {
                Ok(body) => {
                    self.pause(self.config.base_interval()).await;
                    match self.into_page(url, body, want_document) {
                        Ok(page) => {
                            tracing::debug!("Fetched {} on attempt {}/{}", url, attempt, limit);
                            return Ok(page);
                        }
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            tracing::warn!("Attempt {}/{} failed: {}", attempt, limit, error);
            self.counters.record_error(error.to_string());

            if attempt < limit {
                self.pause(self.config.error_interval()).await;
                self.counters.record_retry();
            }
        }

        tracing::error!("Giving up on {} after {} attempts", url, limit);
        self.counters.record_rate_limit_failure(url);
        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: limit,
        })
    }

    /// Fetches `url` as raw text
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.fetch(url, false).await.map(|page| page.body)
    }

    /// Fetches `url` as a parsed, tracking-free document
    pub async fn fetch_document(&self, url: &str) -> Result<Document, FetchError> {
        let page = self.fetch(url, true).await?;
        page.document.ok_or_else(|| FetchError::Parse {
            url: url.to_string(),
            message: "document missing from fetched page".to_string(),
        })
    }

    /// Performs one network round trip and classifies the outcome
    async fn attempt(&self, url: &str, want_document: bool) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        self.classify(url, status.as_u16(), body, want_document)
    }

    /// Decides whether a received body counts as a success
    ///
    /// The origin serves block and not-found pages with HTTP 200, so the body is
    /// inspected regardless of status.
    pub fn classify(
        &self,
        url: &str,
        status: u16,
        body: String,
        want_document: bool,
    ) -> Result<String, FetchError> {
        let lowered = body.to_ascii_lowercase();

        if lowered.contains(&self.block_signature) {
            return Err(FetchError::Blocked {
                url: url.to_string(),
            });
        }

        if lowered.contains(&self.not_found_signature) {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }

        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        if want_document && body.trim().is_empty() {
            return Err(FetchError::Parse {
                url: url.to_string(),
                message: "empty body".to_string(),
            });
        }

        Ok(body)
    }

    fn into_page(&self, url: &str, body: String, want_document: bool) -> Result<FetchedPage, FetchError> {
        let document = if want_document {
            Some(self.prepare_document(url, &body)?)
        } else {
            None
        };
        Ok(FetchedPage { body, document })
    }

    fn prepare_document(&self, url: &str, body: &str) -> Result<Document, FetchError> {
        let to_parse_error = |message: String| FetchError::Parse {
            url: url.to_string(),
            message,
        };

        let mut document = Document::parse(body).map_err(|e| to_parse_error(e.to_string()))?;
        let removed = document
            .remove(&self.tracking_link_selector)
            .map_err(|e| to_parse_error(e.to_string()))?;
        if removed > 0 {
            tracing::trace!("Stripped {} tracking links from {}", removed, url);
        }

        Ok(document)
    }

    async fn pause(&self, interval: (Duration, Duration)) {
        let duration = jitter(interval);
        self.counters.record_sleep(duration);
        tokio::time::sleep(duration).await;
    }
}
