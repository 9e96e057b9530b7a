//! Shared progress record for a crawl
//!
//! A single [`TaskTracker`] lives for the whole process. Each crawl resets it,
//! the resolver and scheduler write into it, and any observer may take a
//! [`ProgressSnapshot`] at any time.
//!
//! # Write discipline
//!
//! - `total_urls` is written once per run, right after resolution
//! - `visited_urls` only grows while the run is active
//! - `error` is written at most once per run and marks it terminal
//! - `is_running` goes false exactly when the run finishes

use crate::config::VisitOptions;
use crate::crawler::VisitOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Progress of the current (or last) crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    /// A crawl is in progress
    pub is_running: bool,

    /// Number of URLs the sitemap resolved to
    pub total_urls: usize,

    /// One entry per finished visit, in completion order
    pub visited_urls: Vec<String>,

    /// Last URL dispatched (advisory when batches are wider than one)
    pub current_url: Option<String>,

    /// Fatal error that ended the run
    pub error: Option<String>,

    /// When the current run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the current run finished
    pub finished_at: Option<DateTime<Utc>>,
}

/// Read-only view of the task record plus the active options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub is_running: bool,
    pub total_urls: usize,
    pub visited_count: usize,
    pub visited_urls: Vec<String>,
    pub current_url: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub options: Option<VisitOptions>,
}

/// Returned when a crawl is started while another one is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyRunning;

/// Thread-safe owner of the [`TaskState`]
#[derive(Debug, Default)]
pub struct TaskTracker {
    record: RwLock<Record>,
}

#[derive(Debug, Default)]
struct Record {
    state: TaskState,

    /// `total_urls` was written during the current run
    total_set: bool,
}

impl TaskTracker {
    /// Creates an idle tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the record for a new run and marks it running
    ///
    /// Fails without touching the record if a run is already active.
    pub fn try_begin(&self) -> Result<(), AlreadyRunning> {
        let mut record = self.write();
        if record.state.is_running {
            return Err(AlreadyRunning);
        }

        *record = Record {
            state: TaskState {
                is_running: true,
                started_at: Some(Utc::now()),
                ..TaskState::default()
            },
            total_set: false,
        };
        Ok(())
    }

    /// Records how many URLs the run will visit
    ///
    /// Only the first call of a run takes effect.
    pub fn set_total(&self, total: usize) {
        let mut record = self.write();
        if record.total_set {
            tracing::warn!(
                "Ignoring second total of {} URLs (already {})",
                total,
                record.state.total_urls
            );
            return;
        }
        record.state.total_urls = total;
        record.total_set = true;
    }

    /// Records the most recently dispatched URL
    pub fn set_current(&self, url: &str) {
        self.write().state.current_url = Some(url.to_string());
    }

    /// Appends a finished visit
    pub fn record(&self, outcome: &VisitOutcome) {
        self.write().state.visited_urls.push(outcome.to_string());
    }

    /// Stores a fatal error for this run
    ///
    /// The first error wins; later ones are logged and dropped.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        let mut record = self.write();
        let state = &mut record.state;
        match &state.error {
            Some(existing) => {
                tracing::debug!("Run already failed ({}), dropping: {}", existing, message);
            }
            None => state.error = Some(message),
        }
    }

    /// Marks the run as no longer active
    pub fn finish(&self) {
        let mut record = self.write();
        record.state.is_running = false;
        record.state.finished_at = Some(Utc::now());
    }

    /// Returns true while a run is active
    pub fn is_running(&self) -> bool {
        self.read().state.is_running
    }

    /// Returns a copy of the raw record
    pub fn state(&self) -> TaskState {
        self.read().state.clone()
    }

    /// Returns an observer view of the record
    pub fn snapshot(&self, options: Option<&VisitOptions>) -> ProgressSnapshot {
        let record = self.read();
        let state = &record.state;
        ProgressSnapshot {
            is_running: state.is_running,
            total_urls: state.total_urls,
            visited_count: state.visited_urls.len(),
            visited_urls: state.visited_urls.clone(),
            current_url: state.current_url.clone(),
            error: state.error.clone(),
            started_at: state.started_at,
            finished_at: state.finished_at,
            options: options.cloned(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Record> {
        self.record.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Record> {
        self.record.write().unwrap_or_else(PoisonError::into_inner)
    }
}
