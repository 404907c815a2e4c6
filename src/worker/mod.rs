//! Search workers and the pool that runs them in parallel.
//!
//! This module provides:
//! - The per-worker search loop ([`SearchController`])
//! - The typed event stream it emits
//! - A thread pool that splits one search across many controllers

mod controller;
mod event;
mod pool;

pub use controller::SearchController;
pub use event::{SearchEvent, SearchOutcome, SearchProgress, WorkerEvent};
pub use pool::{split_count, WorkerPool};
