//! Crawler coordinator - crawl start and task handle
//!
//! This module ties the pieces of a crawl together:
//! - Claiming the shared task record for a new run
//! - Resolving the sitemap inline so resolution errors reach the caller
//! - Spawning the visiting pass and handing back a [`CrawlHandle`]

use crate::browser::{BrowserLauncher, ChromiumLauncher};
use crate::config::{Config, VisitOptions};
use crate::crawler::scheduler::{RunSummary, VisitScheduler};
use crate::crawler::visitor::PageVisitor;
use crate::jitter::Jitter;
use crate::sitemap::{DocumentFetcher, HttpFetcher, SitemapResolver};
use crate::state::{ProgressSnapshot, TaskTracker};
use crate::CrawlError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Main crawler coordinator structure
///
/// One coordinator owns one [`TaskTracker`]; at most one crawl runs through
/// it at a time.
pub struct Coordinator {
    config: Arc<Config>,
    tracker: Arc<TaskTracker>,
    fetcher: Arc<dyn DocumentFetcher>,
    launcher: Arc<dyn BrowserLauncher>,
    jitter: Arc<Jitter>,
}

impl Coordinator {
    /// Creates a coordinator backed by reqwest and Chromium
    ///
    /// # Arguments
    ///
    /// * `config` - Validated crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to start crawls
    /// * `Err(CrawlError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::with_user_agent(
            &config.visit.user_agent,
            Duration::from_millis(config.sitemap.request_timeout),
        )?;
        let launcher = ChromiumLauncher::new(config.browser.clone());

        Ok(Self::with_components(
            config,
            Arc::new(fetcher),
            Arc::new(launcher),
            Arc::new(Jitter::from_entropy()),
        ))
    }

    /// Creates a coordinator from explicit collaborators
    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn DocumentFetcher>,
        launcher: Arc<dyn BrowserLauncher>,
        jitter: Arc<Jitter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tracker: Arc::new(TaskTracker::new()),
            fetcher,
            launcher,
            jitter,
        }
    }

    /// Shared task record written by every crawl of this coordinator
    pub fn tracker(&self) -> Arc<TaskTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current progress plus the active visit options
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tracker.snapshot(Some(&self.config.visit))
    }

    /// Resolves a sitemap without touching the task record
    pub async fn resolve(&self, sitemap_url: &str) -> Result<Vec<String>, CrawlError> {
        Ok(self.resolver().resolve(sitemap_url).await?)
    }

    /// Starts a crawl of `sitemap_url`
    ///
    /// The sitemap is resolved before this returns; the visiting pass then
    /// runs on its own task.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlHandle)` - Visiting has been spawned
    /// * `Err(CrawlError::AlreadyRunning)` - Another crawl holds the record
    /// * `Err(CrawlError::Resolve)` - The sitemap tree could not be resolved;
    ///   the error is also stored in the task record
    pub async fn start(&self, sitemap_url: &str) -> Result<CrawlHandle, CrawlError> {
        self.tracker
            .try_begin()
            .map_err(|_| CrawlError::AlreadyRunning)?;
        let guard = StartGuard::new(&self.tracker);

        tracing::info!("Starting crawl of {}", sitemap_url);

        let urls = match self.resolver().resolve(sitemap_url).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!("{}", e);
                self.tracker.fail(e.to_string());
                self.tracker.finish();
                guard.disarm();
                return Err(e.into());
            }
        };

        tracing::info!("Sitemap resolved to {} URLs", urls.len());
        self.tracker.set_total(urls.len());

        let scheduler = self.scheduler();
        let tracker = Arc::clone(&self.tracker);
        let task = tokio::spawn(async move { scheduler.run(urls, &tracker).await });
        guard.disarm();

        Ok(CrawlHandle {
            task,
            tracker: Arc::clone(&self.tracker),
        })
    }

    fn resolver(&self) -> SitemapResolver {
        SitemapResolver::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.jitter),
            self.config.sitemap.clone(),
        )
    }

    fn scheduler(&self) -> VisitScheduler {
        let options: Arc<VisitOptions> = Arc::new(self.config.visit.clone());
        let visitor = PageVisitor::new(
            Arc::clone(&options),
            &self.config.browser,
            Arc::clone(&self.jitter),
        );
        VisitScheduler::new(
            Arc::clone(&self.launcher),
            visitor,
            options,
            Arc::clone(&self.jitter),
        )
    }
}

/// Ends the run if `start` is dropped between claiming the record and
/// spawning the visiting pass
struct StartGuard<'a> {
    tracker: &'a TaskTracker,
    armed: bool,
}

impl<'a> StartGuard<'a> {
    fn new(tracker: &'a TaskTracker) -> Self {
        Self {
            tracker,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("Crawl start was cancelled before visiting began");
            self.tracker.fail("Crawl start cancelled before visiting began");
            self.tracker.finish();
        }
    }
}

/// Handle to a spawned visiting pass
///
/// Dropping the handle detaches the pass; it keeps running and still
/// finalizes the task record.
#[derive(Debug)]
pub struct CrawlHandle {
    task: JoinHandle<RunSummary>,
    tracker: Arc<TaskTracker>,
}

impl CrawlHandle {
    /// Returns true once the visiting pass has ended
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the visiting pass to end
    pub async fn wait(self) -> Result<RunSummary, CrawlError> {
        match self.task.await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                let message = e.to_string();
                tracing::error!("Crawl task ended abnormally: {}", message);
                self.tracker.fail(message.clone());
                self.tracker.finish();
                Err(CrawlError::TaskAborted(message))
            }
        }
    }
}
