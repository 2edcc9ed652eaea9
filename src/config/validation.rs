use crate::config::types::{Config, CrawlerConfig, SecurityConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_security_config(&config.security)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.min_delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "min_delay must be non-negative, got {}",
            config.min_delay
        )));
    }

    if config.max_delay < config.min_delay {
        return Err(ConfigError::Validation(format!(
            "max_delay must be >= min_delay, got {} < {}",
            config.max_delay, config.min_delay
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    if config.max_concurrent_jobs < 1 || config.max_concurrent_jobs > 10 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_jobs must be between 1 and 10, got {}",
            config.max_concurrent_jobs
        )));
    }

    // The retry backoff shifts by attempt number, so the count must stay
    // well below the bit width
    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.max_pages < 1 || config.max_pages > 100 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and 100, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates security configuration
fn validate_security_config(config: &SecurityConfig) -> Result<(), ConfigError> {
    if config.allowed_schemes.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_schemes cannot be empty".to_string(),
        ));
    }

    for scheme in &config.allowed_schemes {
        if !matches!(scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "allowed_schemes may only contain http and https, got '{}'",
                scheme
            )));
        }
    }

    Ok(())
}
