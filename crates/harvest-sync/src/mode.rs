//! Run-scoped protocol mode registry.
//!
//! The harvesting mode is decided once per process run and then shared by
//! every target. Resolution order:
//! 1. an explicit start cursor on a target's first pass
//! 2. the mode recorded in the target's checkpoint
//! 3. a probe fetch from the default timestamp

use std::sync::OnceLock;

use tracing::info;

use harvest_types::{Checkpoint, Cursor, HarvestMode, StartCursor};

/// Where and how a target's cycle starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartPlan {
    /// Cursor for the first fetch
    pub cursor: Cursor,
    /// Mode to fetch with; `Unknown` means the fetch is a probe
    pub mode: HarvestMode,
}

impl StartPlan {
    /// Whether the first fetch must also determine the mode.
    pub fn is_probe(&self) -> bool {
        !self.mode.is_resolved()
    }
}

/// Single-assignment holder for the run's harvesting mode.
#[derive(Debug, Default)]
pub struct ModeRegistry {
    mode: OnceLock<HarvestMode>,
}

impl ModeRegistry {
    /// Create an unresolved registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolved mode, if any.
    pub fn get(&self) -> Option<HarvestMode> {
        self.mode.get().copied()
    }

    /// Fix the mode if still unresolved and return the mode in effect.
    ///
    /// Later calls never change an already fixed mode. `Unknown` is ignored.
    pub fn fix(&self, mode: HarvestMode) -> HarvestMode {
        if !mode.is_resolved() {
            return self.get().unwrap_or_default();
        }
        *self.mode.get_or_init(|| {
            info!(mode = %mode, "Harvesting mode resolved");
            mode
        })
    }

    /// Fix the mode from a probe response.
    pub fn resolve_from_probe(&self, supports_sequence: bool) -> HarvestMode {
        if supports_sequence {
            self.fix(HarvestMode::Sequence)
        } else {
            self.fix(HarvestMode::Timestamp)
        }
    }

    /// Plan the first fetch of a target's cycle.
    ///
    /// `explicit` is the operator's start cursor and must only be passed on
    /// the target's first pass.
    pub fn plan_start(
        &self,
        checkpoint: &Checkpoint,
        explicit: Option<&StartCursor>,
        default_timestamp: &str,
    ) -> StartPlan {
        let mode = match self.get() {
            Some(mode) => mode,
            None => {
                if let Some(start) = explicit {
                    self.fix(start.mode())
                } else {
                    let recorded = checkpoint.effective_mode();
                    if !recorded.is_resolved() {
                        let from = checkpoint
                            .timestamp
                            .clone()
                            .unwrap_or_else(|| default_timestamp.to_string());
                        return StartPlan {
                            cursor: Cursor::Timestamp(from),
                            mode: HarvestMode::Unknown,
                        };
                    }
                    self.fix(recorded)
                }
            }
        };

        let fallback_timestamp = || {
            Cursor::Timestamp(
                checkpoint
                    .timestamp
                    .clone()
                    .unwrap_or_else(|| default_timestamp.to_string()),
            )
        };

        let cursor = match (mode, explicit) {
            (mode, Some(start)) if start.mode() == mode => start.to_cursor(),
            (HarvestMode::Sequence, _) => match &checkpoint.sequence {
                Some(seq) => Cursor::Sequence(seq.clone()),
                // No sequence recorded yet: enter the sequence stream by date
                None => fallback_timestamp(),
            },
            _ => fallback_timestamp(),
        };

        StartPlan { cursor, mode }
    }
}
