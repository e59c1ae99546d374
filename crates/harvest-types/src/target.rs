//! Harvest targets.

use serde::{Deserialize, Serialize};

/// One logical index or shard, fed by one harvesting endpoint and
/// one remote index host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name, also the checkpoint key
    pub name: String,

    /// Base URL of the harvesting endpoint
    pub harvest_url: String,

    /// Host running the remote indexer for this target
    pub index_host: String,

    /// Skip this target entirely
    #[serde(default)]
    pub excluded: bool,

    /// Request snapshots without optimization
    #[serde(default)]
    pub skip_optimize: bool,
}

impl Target {
    /// Create a target with no exclusion flags.
    pub fn new(
        name: impl Into<String>,
        harvest_url: impl Into<String>,
        index_host: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            harvest_url: harvest_url.into(),
            index_host: index_host.into(),
            excluded: false,
            skip_optimize: false,
        }
    }

    /// Mark the target as excluded.
    pub fn with_excluded(mut self, excluded: bool) -> Self {
        self.excluded = excluded;
        self
    }

    /// Mark the target as exempt from snapshot optimization.
    pub fn with_skip_optimize(mut self, skip: bool) -> Self {
        self.skip_optimize = skip;
        self
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
