//! Crawler module for resolving and visiting a sitemap
//!
//! This module contains the crawl orchestration logic, including:
//! - Single page visits in isolated browsing contexts
//! - Paced, batched scheduling of visits over one browser session
//! - Crawl start and the task handle returned to callers

mod coordinator;
mod scheduler;
mod visitor;

#[cfg(test)]
mod testing;

pub use coordinator::{CrawlHandle, Coordinator};
pub use scheduler::{batch_width, RunSummary, VisitScheduler};
pub use visitor::{PageVisitor, VisitOutcome, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
