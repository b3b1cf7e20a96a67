use crate::config::types::{
    Config, DelayConfig, DelayRange, DiscoveryConfig, FetcherConfig, OutputConfig,
    UserAgentConfig,
};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_fetcher_config(&config.fetcher)?;
    validate_delay_config(&config.delays)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_discovery_config(&config.discovery)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> ConfigResult<()> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1, got 0".to_string(),
        ));
    }

    if config.backoff_base_secs < 1 {
        return Err(ConfigError::Validation(
            "backoff_base_secs must be >= 1".to_string(),
        ));
    }

    if config.backoff_cap_secs < config.backoff_base_secs {
        return Err(ConfigError::Validation(format!(
            "backoff_cap_secs ({}) must be >= backoff_base_secs ({})",
            config.backoff_cap_secs, config.backoff_base_secs
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_delay_config(config: &DelayConfig) -> ConfigResult<()> {
    validate_delay_range("after-fetch", &config.after_fetch)?;
    validate_delay_range("between-keys", &config.between_keys)?;
    validate_delay_range("between-items", &config.between_items)?;
    Ok(())
}

fn validate_delay_range(name: &str, range: &DelayRange) -> ConfigResult<()> {
    if range.min_ms > range.max_ms {
        return Err(ConfigError::Validation(format!(
            "delay '{}' has min-ms {} greater than max-ms {}",
            name, range.min_ms, range.max_ms
        )));
    }
    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_discovery_config(config: &DiscoveryConfig) -> ConfigResult<()> {
    let site = Url::parse(&config.site_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site-url: {}", e)))?;

    if site.scheme() != "http" && site.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "site-url '{}' must use http or https",
            config.site_url
        )));
    }

    if site.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "site-url '{}' has no host",
            config.site_url
        )));
    }

    if !config.search_url.contains("{key}") {
        return Err(ConfigError::Validation(format!(
            "search-url '{}' must contain the {{key}} placeholder",
            config.search_url
        )));
    }

    Url::parse(&config.search_url_for("a"))
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search-url: {}", e)))?;

    if config.keys.is_empty() {
        return Err(ConfigError::Validation(
            "discovery keys cannot be empty".to_string(),
        ));
    }

    if config.keys.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "discovery keys cannot be blank".to_string(),
        ));
    }

    if config.item_path_marker.is_empty() {
        return Err(ConfigError::Validation(
            "item-path-marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.artifact_stem.is_empty() {
        return Err(ConfigError::Validation(
            "artifact-stem cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(
            "checkpoint-interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}
