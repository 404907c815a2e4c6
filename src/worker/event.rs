//! Events emitted by a search worker.

use crate::crypto::MatchResult;

/// Attempt count reported at a fixed cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchProgress {
    pub attempts: u64,
}

/// How a search ended. Exactly one per search, always the last event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Target reached or cancelled; carries the final attempt count
    Exited(u64),
    /// The search could not run or broke outside the per-batch fault boundary
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    Match(MatchResult),
    Progress(SearchProgress),
    Finished(SearchOutcome),
}

impl SearchEvent {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchEvent::Finished(_))
    }
}

/// A [`SearchEvent`] tagged with the worker that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEvent {
    pub worker_id: usize,
    pub event: SearchEvent,
}
