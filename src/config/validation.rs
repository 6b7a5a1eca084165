use crate::config::types::{
    Config, CrawlerConfig, EmbedderConfig, OutputConfig, SearchConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_embedder_config(&config.embedder)?;
    validate_search_config(&config.search)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.download_dir.is_empty() {
        return Err(ConfigError::Validation(
            "download_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates embedder configuration
fn validate_embedder_config(config: &EmbedderConfig) -> Result<(), ConfigError> {
    if config.dimensions < 1 {
        return Err(ConfigError::Validation(
            "embedder dimensions must be >= 1".to_string(),
        ));
    }

    if config.max_chars < 1 {
        return Err(ConfigError::Validation(
            "embedder max_chars must be >= 1".to_string(),
        ));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "embedder model cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid embedder base_url: {}", e)))?;

    Ok(())
}

/// Validates search configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.top_k < 1 {
        return Err(ConfigError::Validation("top_k must be >= 1".to_string()));
    }

    if config.snippet_chars < 1 {
        return Err(ConfigError::Validation(
            "snippet_chars must be >= 1".to_string(),
        ));
    }

    Ok(())
}
