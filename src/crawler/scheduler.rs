//! Batch scheduler for page visits
//!
//! This module handles:
//! - Owning the browser session for exactly one run
//! - Splitting the URL list into batches of `max_concurrent`
//! - Visiting each batch concurrently and recording outcomes as they land
//! - Pausing a random time between batches
//! - Closing the session and clearing `is_running` however the run ends

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::config::VisitOptions;
use crate::crawler::visitor::PageVisitor;
use crate::jitter::Jitter;
use crate::state::TaskTracker;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Counters for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Batches that ran to completion
    pub batches: usize,

    /// Visits that succeeded
    pub succeeded: usize,

    /// Visits recorded as failures
    pub failed: usize,
}

/// Drives a [`PageVisitor`] over a URL list in paced batches
pub struct VisitScheduler {
    launcher: Arc<dyn BrowserLauncher>,
    visitor: PageVisitor,
    options: Arc<VisitOptions>,
    jitter: Arc<Jitter>,
}

impl VisitScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `launcher` - Starts the browser session owned by each run
    /// * `visitor` - Performs the individual visits
    /// * `options` - Batch width and inter-batch pacing
    /// * `jitter` - Random source for the inter-batch pause
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        visitor: PageVisitor,
        options: Arc<VisitOptions>,
        jitter: Arc<Jitter>,
    ) -> Self {
        Self {
            launcher,
            visitor,
            options,
            jitter,
        }
    }

    /// Visits every URL and records the outcomes in `tracker`
    ///
    /// Batches run strictly one after another; visits within a batch run
    /// concurrently and are recorded in the order they finish. A random pause
    /// in `[delay_min, delay_max]` separates consecutive batches.
    ///
    /// The browser session is closed exactly once and `tracker` stops running
    /// on every exit path. A failed launch or a panic while visiting is
    /// written to the tracker as the run's error.
    pub async fn run(&self, urls: Vec<String>, tracker: &TaskTracker) -> RunSummary {
        let mut summary = RunSummary::default();

        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Could not start browser: {}", e);
                tracker.fail(e.to_string());
                tracker.finish();
                return summary;
            }
        };

        let visiting = AssertUnwindSafe(self.visit_batches(&urls, session.as_ref(), tracker, &mut summary))
            .catch_unwind()
            .await;

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }

        if let Err(panic) = visiting {
            let message = format!("Visiting aborted: {}", panic_message(panic.as_ref()));
            tracing::error!("{}", message);
            tracker.fail(message);
        }

        tracker.finish();

        tracing::info!(
            "Visited {} pages in {} batches ({} failed)",
            summary.succeeded + summary.failed,
            summary.batches,
            summary.failed
        );

        summary
    }

    async fn visit_batches(
        &self,
        urls: &[String],
        session: &dyn BrowserSession,
        tracker: &TaskTracker,
        summary: &mut RunSummary,
    ) {
        let width = batch_width(&self.options);
        let batch_count = urls.len().div_ceil(width);

        for (index, batch) in urls.chunks(width).enumerate() {
            if let Some(last) = batch.last() {
                tracker.set_current(last);
            }

            tracing::debug!(
                "Starting batch {}/{} ({} URLs)",
                index + 1,
                batch_count,
                batch.len()
            );

            let mut in_flight: FuturesUnordered<_> = batch
                .iter()
                .map(|url| self.visitor.visit(url, session))
                .collect();

            while let Some(outcome) = in_flight.next().await {
                if outcome.is_success() {
                    summary.succeeded += 1;
                } else {
                    summary.failed += 1;
                }
                tracker.record(&outcome);
            }

            summary.batches += 1;

            if index + 1 < batch_count {
                let pause = self
                    .jitter
                    .delay_between(self.options.delay_min, self.options.delay_max);
                tracing::debug!("Pausing {:?} before the next batch", pause);
                tokio::time::sleep(pause).await;
            }
        }
    }
}

/// Batch width from the options, never below one
pub fn batch_width(options: &VisitOptions) -> usize {
    usize::try_from(options.max_concurrent).unwrap_or(usize::MAX).max(1)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
