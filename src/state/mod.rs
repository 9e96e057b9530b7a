//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TaskTracker`: shared, lock-protected owner of the progress record
//! - `TaskState`: the record itself
//! - `ProgressSnapshot`: the serializable view handed to observers

mod task;

// Re-export main types
pub use task::{AlreadyRunning, ProgressSnapshot, TaskState, TaskTracker};
