//! Single page visit
//!
//! A visit opens a fresh browsing context, navigates, lets the page settle,
//! optionally scrolls around like a reader, and closes the context again.
//! Every failure is turned into a [`VisitOutcome::Failure`]; nothing escapes
//! `visit`, so one bad page never takes its batch down with it.

use crate::browser::{BrowserError, BrowserSession, BrowsingContext, ContextSetup, Viewport};
use crate::config::{BrowserConfig, VisitOptions};
use crate::jitter::Jitter;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

/// Viewport width band, in pixels
pub const VIEWPORT_WIDTH: Range<u32> = 1100..1400;

/// Viewport height band, in pixels
pub const VIEWPORT_HEIGHT: Range<u32> = 700..900;

/// Distance of the first reading scroll, in pixels
const FIRST_SCROLL: Range<u32> = 300..1000;

/// Distance of the second reading scroll, in pixels
const SECOND_SCROLL: Range<u32> = 200..700;

/// Pause after each reading scroll (milliseconds, inclusive)
const SCROLL_PAUSE_MS: (u64, u64) = (800, 2000);

/// Probability of returning to the top before leaving
const SCROLL_TO_TOP_PROBABILITY: f64 = 0.3;

/// Result of visiting one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitOutcome {
    /// The page loaded and the context closed cleanly
    Success { url: String },

    /// Something went wrong; `error` says what
    Failure { url: String, error: String },
}

impl VisitOutcome {
    pub fn success(url: impl Into<String>) -> Self {
        Self::Success { url: url.into() }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failure {
            url: url.into(),
            error: error.into(),
        }
    }

    /// The visited URL
    pub fn url(&self) -> &str {
        match self {
            Self::Success { url } | Self::Failure { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Progress entries are the bare URL on success and an annotated URL otherwise
impl fmt::Display for VisitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { url } => write!(f, "{}", url),
            Self::Failure { url, error } => write!(f, "{} (visit failed: {})", url, error),
        }
    }
}

/// Visits single pages inside isolated browsing contexts
#[derive(Debug, Clone)]
pub struct PageVisitor {
    options: Arc<VisitOptions>,
    navigation_timeout: Duration,
    accept_language: String,
    post_visit_delay: (u64, u64),
    jitter: Arc<Jitter>,
}

impl PageVisitor {
    /// Creates a visitor
    ///
    /// # Arguments
    ///
    /// * `options` - Options of the current run
    /// * `browser` - Navigation timeout, headers and post-visit pacing
    /// * `jitter` - Random source for viewport, delays and scrolling
    pub fn new(options: Arc<VisitOptions>, browser: &BrowserConfig, jitter: Arc<Jitter>) -> Self {
        Self {
            options,
            navigation_timeout: Duration::from_millis(browser.navigation_timeout),
            accept_language: browser.accept_language.clone(),
            post_visit_delay: (browser.post_visit_delay_min, browser.post_visit_delay_max),
            jitter,
        }
    }

    /// Visits `url` once
    ///
    /// 1. Opens a browsing context with the run's user agent and a jittered viewport
    /// 2. Navigates, waiting for the network to go quiet
    /// 3. Waits a random settle time of at most `load_wait_time`
    /// 4. Scrolls like a reader when `simulate_human` is set
    /// 5. Closes the context, whatever happened before
    /// 6. Pauses briefly before returning
    pub async fn visit(&self, url: &str, session: &dyn BrowserSession) -> VisitOutcome {
        tracing::debug!("Visiting {}", url);

        let outcome = match self.visit_in_context(url, session).await {
            Ok(()) => {
                tracing::info!("Visited {}", url);
                VisitOutcome::success(url)
            }
            Err(e) => {
                tracing::warn!("Visit to {} failed: {}", url, e);
                VisitOutcome::failure(url, e.to_string())
            }
        };

        let pause = self
            .jitter
            .delay_between(self.post_visit_delay.0, self.post_visit_delay.1);
        tokio::time::sleep(pause).await;

        outcome
    }

    /// Identity for the next browsing context
    pub fn context_setup(&self) -> ContextSetup {
        ContextSetup {
            user_agent: self.options.user_agent.clone(),
            viewport: Viewport {
                width: self.jitter.pick(VIEWPORT_WIDTH),
                height: self.jitter.pick(VIEWPORT_HEIGHT),
            },
            accept_language: self.accept_language.clone(),
        }
    }

    async fn visit_in_context(&self, url: &str, session: &dyn BrowserSession) -> Result<(), BrowserError> {
        let mut context = session.new_context(&self.context_setup()).await?;

        let interaction = self.interact(url, context.as_mut()).await;
        let released = context.close().await;

        match (interaction, released) {
            (Ok(()), released) => released,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!("Failed to close browsing context for {}: {}", url, close_err);
                Err(e)
            }
        }
    }

    async fn interact(&self, url: &str, context: &mut dyn BrowsingContext) -> Result<(), BrowserError> {
        context.navigate(url, self.navigation_timeout).await?;

        let settle = self.settle_delay();
        tracing::trace!("Letting {} settle for {:?}", url, settle);
        tokio::time::sleep(settle).await;

        if self.options.simulate_human {
            self.simulate_reading(context).await?;
        }

        Ok(())
    }

    /// Settle time drawn from the upper half of `[0, load_wait_time]`
    fn settle_delay(&self) -> Duration {
        let max = self.options.load_wait_time;
        self.jitter.delay_between(max / 2, max)
    }

    async fn simulate_reading(&self, context: &mut dyn BrowsingContext) -> Result<(), BrowserError> {
        context.scroll_by(self.jitter.pick(FIRST_SCROLL)).await?;
        self.scroll_pause().await;

        context.scroll_by(self.jitter.pick(SECOND_SCROLL)).await?;
        self.scroll_pause().await;

        if self.jitter.chance(SCROLL_TO_TOP_PROBABILITY) {
            context.scroll_to_top().await?;
        }

        Ok(())
    }

    async fn scroll_pause(&self) {
        let pause = self.jitter.delay_between(SCROLL_PAUSE_MS.0, SCROLL_PAUSE_MS.1);
        tokio::time::sleep(pause).await;
    }
}
