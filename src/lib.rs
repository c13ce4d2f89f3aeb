//! DrugBank Harvester: a patient catalog scraper
//!
//! This crate walks the paginated DrugBank catalog, fetches every drug detail page
//! through a retrying, rate-limited fetcher, turns each page's field list into a typed
//! [`Record`], and aggregates corpus-wide quality statistics.

pub mod config;
pub mod crawler;
pub mod document;
pub mod extract;
pub mod output;
pub mod record;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    #[error("Document error: {0}")]
    Document(#[from] document::DocumentError),

    #[error("Invalid harvest target: {0}")]
    InvalidTarget(String),

    #[error("Record extraction fault for {url}: {message}")]
    RecordFault { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a single logical fetch
///
/// Every variant except [`FetchError::Exhausted`] is transient and consumes one retry
/// attempt. `Exhausted` is terminal: the caller skips the page and never retries.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Block page served for {url}")]
    Blocked { url: String },

    #[error("Not-found page served for {url}")]
    NotFound { url: String },

    #[error("Unparseable document for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Failed to fetch {url} after {attempts} attempts")]
    Exhausted { url: String, attempts: u32 },
}

impl FetchError {
    /// Whether this failure may be retried
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Exhausted { .. })
    }

    /// The URL the failure belongs to
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Blocked { url }
            | FetchError::NotFound { url }
            | FetchError::Parse { url, .. }
            | FetchError::Exhausted { url, .. } => url,
        }
    }
}

/// Errors raised while routing one field of one record
///
/// None of these abort a record: the engine logs them and moves to the next field.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Malformed {field} value: {input:?}")]
    Malformed { field: &'static str, input: String },

    #[error("Handler for {field} cannot write into a {slot} destination")]
    Mismatch {
        field: &'static str,
        slot: &'static str,
    },

    #[error("Handler for {field} failed: {message}")]
    Handler { field: &'static str, message: String },

    #[error("Secondary fetch for {field} failed: {source}")]
    Secondary {
        field: &'static str,
        source: FetchError,
    },

    #[error("Payload for {field} could not be decoded: {source}")]
    Payload {
        field: &'static str,
        source: serde_json::Error,
    },

    #[error("Selector error in {field}: {source}")]
    Selector {
        field: &'static str,
        source: document::DocumentError,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for field routing
pub type FieldResult<T> = std::result::Result<T, FieldError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Fetcher, Harvester, HarvestTarget, RunCounters};
pub use extract::{ExtractionEngine, HandlerRegistry};
pub use output::{RunStats, StatsAggregator};
pub use record::{InchiPair, Interaction, Link, MoaRow, MolWeight, Record};
