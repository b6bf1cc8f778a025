//! Statistics tracking for the event manager.
use serde::{Deserialize, Serialize};

/// Dispatch counters for monitoring script activity.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Events that reached at least the iteration stage
    pub events_fired: u64,
    /// Events skipped by suppression (no listeners, or paused)
    pub events_suppressed: u64,
    /// Handler calls made
    pub handler_invocations: u64,
    /// Handler calls that returned an error
    pub handler_failures: u64,
    /// Subscribers destroyed by the failure policy
    pub subscribers_destroyed: u64,
    /// Commits that applied staged changes
    pub commits_applied: u64,
    /// Dispatches refused because the same kind was already being dispatched
    pub nested_dispatches_rejected: u64,
}
