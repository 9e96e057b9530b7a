//! Browser abstraction
//!
//! The crawler talks to a browser through three traits:
//! - [`BrowserLauncher`] starts a [`BrowserSession`] for one run
//! - [`BrowserSession`] hands out isolated [`BrowsingContext`]s, one per visit
//! - [`BrowsingContext`] navigates and scrolls a single page
//!
//! `chromium` implements them on top of chromiumoxide; tests provide
//! in-memory implementations.

mod chromium;

pub use chromium::{ChromiumContext, ChromiumLauncher, ChromiumSession};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a browser implementation
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("Navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("Browser resource already closed")]
    Closed,
}

/// Window size of a browsing context, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Per-context identity applied before navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSetup {
    /// User-Agent presented to the site
    pub user_agent: String,

    /// Viewport size
    pub viewport: Viewport,

    /// Accept-Language header value
    pub accept_language: String,
}

/// Starts browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launches a fresh browser session
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A running browser owned by a single crawl
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opens an isolated, configured browsing context
    ///
    /// On error nothing is left open.
    async fn new_context(&self, setup: &ContextSetup) -> Result<Box<dyn BrowsingContext>, BrowserError>;

    /// Shuts the browser down
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// One isolated page used for exactly one visit
#[async_trait]
pub trait BrowsingContext: Send {
    /// Navigates to `url` and waits until the network is quiet
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Scrolls the page vertically by `pixels`
    async fn scroll_by(&mut self, pixels: u32) -> Result<(), BrowserError>;

    /// Scrolls back to the top of the page
    async fn scroll_to_top(&mut self) -> Result<(), BrowserError>;

    /// Releases the context and everything it holds
    async fn close(&mut self) -> Result<(), BrowserError>;
}
