use crate::config::types::{
    Config, CrawlerConfig, HttpConfig, LoggingConfig, OutputConfig, SiteConfig,
};
use crate::ConfigError;
use encoding_rs::Encoding;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_http_config(&config.http)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates endpoints and charset labels
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if !config.listing_url_template.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "listing_url_template must contain a {{page}} placeholder, got '{}'",
            config.listing_url_template
        )));
    }

    Url::parse(&config.listing_url(1)).map_err(|e| {
        ConfigError::Validation(format!(
            "listing_url_template does not produce a valid URL: {}",
            e
        ))
    })?;

    validate_encoding_label(&config.listing_encoding)?;
    if let Some(label) = &config.detail_encoding {
        validate_encoding_label(label)?;
    }
    if let Some(label) = &config.comment_encoding {
        validate_encoding_label(label)?;
    }

    if !config.comment_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "comment_path must start with '/', got '{}'",
            config.comment_path
        )));
    }

    if config.city.trim().is_empty() {
        return Err(ConfigError::Validation("city cannot be empty".to_string()));
    }

    Ok(())
}

/// Validates client and retry settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if config.backoff_min_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_min_ms ({}) cannot exceed backoff_max_ms ({})",
            config.backoff_min_ms, config.backoff_max_ms
        )));
    }

    Ok(())
}

/// Validates fan-out settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_size == 0 {
        return Err(ConfigError::Validation(
            "page_size must be >= 1".to_string(),
        ));
    }

    if config.max_items_in_flight == Some(0) {
        return Err(ConfigError::Validation(
            "max_items_in_flight must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates log file names; the two levels must not share a file
fn validate_logging_config(config: &LoggingConfig) -> Result<(), ConfigError> {
    if !config.file_output {
        return Ok(());
    }

    for name in [&config.info_file, &config.error_file] {
        if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
            return Err(ConfigError::Validation(format!(
                "log file name must be a plain file name, got '{}'",
                name
            )));
        }
    }

    if config.info_file == config.error_file {
        return Err(ConfigError::Validation(format!(
            "info_file and error_file must differ, both are '{}'",
            config.info_file
        )));
    }

    Ok(())
}

fn validate_encoding_label(label: &str) -> Result<(), ConfigError> {
    Encoding::for_label(label.as_bytes())
        .map(|_| ())
        .ok_or_else(|| ConfigError::Validation(format!("Unknown encoding label '{}'", label)))
}
