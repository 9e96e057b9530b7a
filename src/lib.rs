//! Sitemap-Walker: a paced sitemap visitor
//!
//! This crate resolves a sitemap (or a tree of sitemap indexes) into a flat list
//! of page URLs and then visits every page in a real browser, with randomized
//! pacing and optional human-like scrolling, while publishing progress to a
//! shared task record.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod jitter;
pub mod sitemap;
pub mod state;

use thiserror::Error;

/// Main error type for Sitemap-Walker operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sitemap resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("A crawl is already running")]
    AlreadyRunning,

    #[error("Crawl task aborted: {0}")]
    TaskAborted(String),
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

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors raised while expanding a sitemap tree into page URLs
///
/// Any of these is fatal to the whole resolution: no partial URL list is
/// ever returned.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to fetch sitemap {location}: {source}")]
    Fetch {
        location: String,
        source: sitemap::FetchError,
    },

    #[error("Malformed XML in sitemap {location}: {message}")]
    Xml { location: String, message: String },

    #[error("Invalid sitemap format at {location}: root element {root:?} is neither <urlset> nor <sitemapindex>")]
    UnrecognizedShape {
        location: String,
        root: Option<String>,
    },

    #[error("Sitemap {location} is nested deeper than the maximum depth of {max_depth}")]
    DepthExceeded { location: String, max_depth: u32 },
}

/// Result type alias for sitemap resolution
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

// Re-export commonly used types
pub use config::{Config, VisitOptions};
pub use crawler::{CrawlHandle, Coordinator, PageVisitor, RunSummary, VisitOutcome, VisitScheduler};
pub use sitemap::{SitemapNode, SitemapResolver};
pub use state::{ProgressSnapshot, TaskState, TaskTracker};
