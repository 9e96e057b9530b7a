use crate::config::types::{BrowserConfig, Config, SitemapConfig, VisitOptions};
use crate::ConfigError;
use url::Url;

/// Largest batch width accepted for `max-concurrent`
const MAX_CONCURRENT_LIMIT: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_visit_options(&config.visit)?;
    validate_sitemap_config(&config.sitemap)?;
    validate_browser_config(&config.browser)?;
    Ok(())
}

/// Validates the options of a visiting pass
fn validate_visit_options(options: &VisitOptions) -> Result<(), ConfigError> {
    validate_delay_range("visit.delay", options.delay_min, options.delay_max)?;

    if options.max_concurrent < 1 || options.max_concurrent > MAX_CONCURRENT_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-concurrent must be between 1 and {}, got {}",
            MAX_CONCURRENT_LIMIT, options.max_concurrent
        )));
    }

    if options.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates sitemap resolution settings
fn validate_sitemap_config(config: &SitemapConfig) -> Result<(), ConfigError> {
    validate_delay_range("sitemap.delay", config.delay_min, config.delay_max)?;

    if config.max_depth < 1 {
        return Err(ConfigError::Validation(
            "sitemap max-depth must be >= 1".to_string(),
        ));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "sitemap request-timeout must be > 0ms".to_string(),
        ));
    }

    Ok(())
}

/// Validates browser settings
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout == 0 {
        return Err(ConfigError::Validation(
            "navigation-timeout must be > 0ms".to_string(),
        ));
    }

    if config.accept_language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "accept-language cannot be empty".to_string(),
        ));
    }

    if let Some(path) = &config.executable {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "executable cannot be an empty path".to_string(),
            ));
        }
    }

    validate_delay_range(
        "browser.post-visit-delay",
        config.post_visit_delay_min,
        config.post_visit_delay_max,
    )
}

/// Parses the sitemap URL given on the command line
///
/// Only `http` and `https` sitemaps can be fetched.
pub fn parse_sitemap_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid sitemap URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::InvalidUrl(format!(
            "Sitemap URL '{}' must use http or https, not {}",
            raw, scheme
        ))),
    }
}

/// Checks that a `[min, max]` millisecond range is not inverted
fn validate_delay_range(name: &str, min: u64, max: u64) -> Result<(), ConfigError> {
    if max < min {
        return Err(ConfigError::Validation(format!(
            "{}-max ({}ms) must be >= {}-min ({}ms)",
            name, max, name, min
        )));
    }
    Ok(())
}
