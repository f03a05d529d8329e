use crate::config::types::{BookConfig, Config, CrawlConfig, HttpConfig, OutputConfig};
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawl_config(&config.crawl)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    validate_book_config(&config.book)?;
    Ok(())
}

/// Validates crawl loop configuration
fn validate_crawl_config(config: &CrawlConfig) -> ConfigResult<()> {
    for (name, value) in [("start_url", &config.start_url), ("end_url", &config.end_url)] {
        if let Some(value) = value {
            validate_page_url(name, value)?;
        }
    }

    validate_selector("content_selector", &config.content_selector)?;
    validate_selector("next_selector", &config.next_selector)?;

    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms ({}) must not exceed max_delay_ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.retry_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "retry_backoff_ms ({}) must not exceed max_backoff_ms ({})",
            config.retry_backoff_ms, config.max_backoff_ms
        )));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> ConfigResult<()> {
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

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.pages_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pages_dir cannot be empty".to_string(),
        ));
    }

    if config.epub_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "epub_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_book_config(config: &BookConfig) -> ConfigResult<()> {
    if config.language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "language cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a crawl URL is absolute and uses http or https
pub fn validate_page_url(name: &str, value: &str) -> ConfigResult<()> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> ConfigResult<()> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!("{} cannot be empty", name)));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {}", name, selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_page_url() {
        assert!(validate_page_url("start_url", "https://example.com/ch-1").is_ok());
        assert!(validate_page_url("start_url", "http://example.com/ch-1").is_ok());

        assert!(validate_page_url("start_url", "").is_err());
        assert!(validate_page_url("start_url", "example.com/ch-1").is_err());
        assert!(validate_page_url("start_url", "ftp://example.com/ch-1").is_err());
    }

    #[test]
    fn test_validate_selector() {
        assert!(validate_selector("next_selector", "#next").is_ok());
        assert!(validate_selector("next_selector", "div.story > p").is_ok());

        assert!(validate_selector("next_selector", "").is_err());
        assert!(validate_selector("next_selector", "div[").is_err());
    }

    #[test]
    fn test_backoff_bounds_must_be_ordered() {
        let mut config = Config::default();
        config.crawl.retry_backoff_ms = 60_000;
        config.crawl.max_backoff_ms = 1_000;

        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }
}
