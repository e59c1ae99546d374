//! Remote indexer control-plane types.

use serde::{Deserialize, Serialize};

/// Outcome of a requested flush, as reported by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushStatus {
    /// Still flushing
    Pending,
    /// Dispatched records are durably queryable
    Success,
    /// Flush failed; the cycle must be repeated
    Failure,
}

/// Parameters identifying a snapshot request and its completion poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRequest {
    /// Whether the indexer should optimize before snapshotting
    pub optimize: bool,

    /// Pipe-separated index path patterns to snapshot
    pub pattern: String,
}

impl SnapshotRequest {
    /// Build the request for a target from a `{target}` pattern template.
    pub fn for_target(target: &str, optimize: bool, template: &str) -> Self {
        Self {
            optimize,
            pattern: template.replace("{target}", target),
        }
    }
}
