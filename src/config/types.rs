use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub fetcher: FetcherConfig,
    pub harvest: HarvestConfig,
    pub output: OutputConfig,
}

/// Where the catalog lives and how its hostile pages look
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host of the catalog, without a trailing slash
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing path and filter query; the page number is appended verbatim
    #[serde(rename = "listing-path")]
    pub listing_path: String,

    /// Marker of the rate-limit block page served with HTTP 200
    #[serde(rename = "block-signature")]
    pub block_signature: String,

    /// Marker of the not-found page served with HTTP 200
    #[serde(rename = "not-found-signature")]
    pub not_found_signature: String,

    /// Reference text of the "entry is a stub" banner
    #[serde(rename = "stub-notice")]
    pub stub_notice: String,

    /// Nodes removed from every parsed document
    #[serde(rename = "tracking-link-selector")]
    pub tracking_link_selector: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://go.drugbank.com".to_string(),
            listing_path: "/drugs?approved=0&nutraceutical=0&illicit=0&investigational=0\
                &withdrawn=0&experimental=0&us=0&ca=0&eu=0&commit=Apply+Filter&page="
                .to_string(),
            block_signature: "error code: 1015".to_string(),
            not_found_signature: "page not found".to_string(),
            stub_notice: "this drug entry is a stub and has not been fully annotated. \
                it is scheduled to be annotated soon."
                .to_string(),
            tracking_link_selector: "a.track-link".to_string(),
        }
    }
}

impl SiteConfig {
    /// URL of one listing page
    pub fn listing_url(&self, page: u32) -> String {
        format!("{}{}{}", self.base_url, self.listing_path, page)
    }

    /// URL of one drug detail page
    pub fn drug_url(&self, id: &str) -> String {
        format!("{}/drugs/{}", self.base_url, id)
    }
}

/// Retry and pacing behaviour of the fetcher
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Total attempts per logical request
    #[serde(rename = "retry-limit")]
    pub retry_limit: u32,

    /// Upper bound of the rate-limiting sleep after a success (milliseconds)
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Upper bound of the recovery sleep after a failure (milliseconds)
    #[serde(rename = "error-delay-ms")]
    pub error_delay_ms: u64,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            retry_limit: 4,
            base_delay_ms: 8_000,
            error_delay_ms: 20_000,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: concat!("drugbank-harvester/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetcherConfig {
    /// Interval the post-success sleep is drawn from
    pub fn base_interval(&self) -> (Duration, Duration) {
        (Duration::ZERO, Duration::from_millis(self.base_delay_ms))
    }

    /// Interval the post-failure sleep is drawn from
    pub fn error_interval(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.error_delay_ms),
        )
    }
}

/// Pipeline sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Highest listing page count accepted from the user
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Concurrent listing fetches and detail workers
    pub workers: usize,

    /// Rows requested per interactions page
    #[serde(rename = "interaction-page-length")]
    pub interaction_page_length: u32,

    /// Cap on interactions pages fetched for one drug
    #[serde(rename = "max-interaction-pages")]
    pub max_interaction_pages: u32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_pages: 508,
            workers: 8,
            interaction_page_length: 100,
            max_interaction_pages: 50,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the corpus file
    #[serde(rename = "results-dir")]
    pub results_dir: String,

    /// Directory receiving the run statistics file
    #[serde(rename = "stats-dir")]
    pub stats_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: "results".to_string(),
            stats_dir: "logs".to_string(),
        }
    }
}
