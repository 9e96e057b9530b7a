use serde::{Deserialize, Serialize};

/// Identity string presented to visited sites unless configured otherwise
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Sitemap-Walker
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub visit: VisitOptions,
    #[serde(default)]
    pub sitemap: SitemapConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Options for one visiting pass
///
/// Constructed once per crawl and never mutated while the crawl runs.
/// Deserialized from kebab-case TOML keys and serialized with the camelCase
/// names used by progress snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct VisitOptions {
    /// Lower bound of the pause between batches (milliseconds)
    #[serde(rename(deserialize = "delay-min", serialize = "delayMin"))]
    pub delay_min: u64,

    /// Upper bound of the pause between batches (milliseconds)
    #[serde(rename(deserialize = "delay-max", serialize = "delayMax"))]
    pub delay_max: u64,

    /// Upper bound of the settle wait after navigation (milliseconds)
    #[serde(rename(deserialize = "load-wait-time", serialize = "loadWaitTime"))]
    pub load_wait_time: u64,

    /// Whether to scroll around the page like a reader would
    #[serde(rename(deserialize = "simulate-human", serialize = "simulateHuman"))]
    pub simulate_human: bool,

    /// Number of pages visited concurrently in one batch
    #[serde(rename(deserialize = "max-concurrent", serialize = "maxConcurrent"))]
    pub max_concurrent: u32,

    /// Identity string presented to visited sites
    #[serde(rename(deserialize = "user-agent", serialize = "userAgent"))]
    pub user_agent: String,
}

impl Default for VisitOptions {
    fn default() -> Self {
        Self {
            delay_min: 3000,
            delay_max: 10000,
            load_wait_time: 5000,
            simulate_human: true,
            max_concurrent: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Sitemap resolution configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    /// Lower bound of the pause before each nested sitemap fetch (milliseconds)
    #[serde(rename = "delay-min")]
    pub delay_min: u64,

    /// Upper bound of the pause before each nested sitemap fetch (milliseconds)
    #[serde(rename = "delay-max")]
    pub delay_max: u64,

    /// Maximum nesting of sitemap indexes below the root document
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Timeout for a single sitemap request (milliseconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            delay_min: 1000,
            delay_max: 3000,
            max_depth: 8,
            request_timeout: 30000,
        }
    }
}

/// Browser launch and per-page configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Path to a Chrome/Chromium binary; auto-detected when absent
    pub executable: Option<String>,

    /// Hard limit for a single navigation (milliseconds)
    #[serde(rename = "navigation-timeout")]
    pub navigation_timeout: u64,

    /// Accept-Language header sent by every browsing context
    #[serde(rename = "accept-language")]
    pub accept_language: String,

    /// Lower bound of the pause after each visit (milliseconds)
    #[serde(rename = "post-visit-delay-min")]
    pub post_visit_delay_min: u64,

    /// Upper bound of the pause after each visit (milliseconds)
    #[serde(rename = "post-visit-delay-max")]
    pub post_visit_delay_max: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            navigation_timeout: 60000,
            accept_language: "en-US,en;q=0.9".to_string(),
            post_visit_delay_min: 500,
            post_visit_delay_max: 1500,
        }
    }
}
