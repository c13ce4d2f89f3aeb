use crate::config::types::{Config, FetcherConfig, HarvestConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_harvest_config(&config.harvest)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the catalog location and page signatures
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use HTTP or HTTPS",
            config.base_url
        )));
    }

    if config.base_url.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "base_url '{}' must not end with '/'",
            config.base_url
        )));
    }

    if !config.listing_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "listing_path '{}' must start with '/'",
            config.listing_path
        )));
    }

    for (name, value) in [
        ("block_signature", &config.block_signature),
        ("not_found_signature", &config.not_found_signature),
        ("stub_notice", &config.stub_notice),
        ("tracking_link_selector", &config.tracking_link_selector),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if scraper::Selector::parse(&config.tracking_link_selector).is_err() {
        return Err(ConfigError::Validation(format!(
            "tracking_link_selector '{}' is not a valid CSS selector",
            config.tracking_link_selector
        )));
    }

    Ok(())
}

/// Validates retry and pacing settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.retry_limit < 1 || config.retry_limit > 20 {
        return Err(ConfigError::Validation(format!(
            "retry_limit must be between 1 and 20, got {}",
            config.retry_limit
        )));
    }

    if config.error_delay_ms < config.base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "error_delay_ms ({}ms) must be >= base_delay_ms ({}ms)",
            config.error_delay_ms, config.base_delay_ms
        )));
    }

    if config.request_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be > 0".to_string(),
        ));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates pipeline sizing
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.interaction_page_length < 1 || config.max_interaction_pages < 1 {
        return Err(ConfigError::Validation(
            "interaction_page_length and max_interaction_pages must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_dir.is_empty() {
        return Err(ConfigError::Validation(
            "results_dir cannot be empty".to_string(),
        ));
    }

    if config.stats_dir.is_empty() {
        return Err(ConfigError::Validation(
            "stats_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
