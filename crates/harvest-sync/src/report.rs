//! Per-target outcomes collected into a run-level report.

use std::collections::BTreeSet;

/// Result of one target's cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Target is in the exclusion set
    Excluded,
    /// First fetch returned no records; checkpoint untouched
    NoChanges,
    /// Records dispatched and the cycle completed
    Updated {
        records: usize,
        partials: usize,
        /// False when the checkpoint write failed; the next cycle repeats the work
        checkpoint_saved: bool,
    },
    /// Cycle abandoned; checkpoint untouched
    Failed { reason: String },
    /// Shutdown requested mid-cycle; checkpoint untouched
    Interrupted,
}

impl TargetOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TargetOutcome::Failed { .. })
    }
}

/// Outcome for a named target within a numbered cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub target: String,
    pub cycle: u64,
    pub outcome: TargetOutcome,
}

/// Run-level summary.
///
/// Keeps the outcomes of the latest cycle plus the names of every target
/// that failed at any point in the run.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    cycles: u64,
    outcomes: Vec<TargetReport>,
    failed: BTreeSet<String>,
    failures: u64,
    interrupted: bool,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle, dropping the previous cycle's outcomes.
    pub fn begin_cycle(&mut self) -> u64 {
        self.cycles += 1;
        self.outcomes.clear();
        self.cycles
    }

    /// Record a target's outcome in the current cycle.
    pub fn record(&mut self, target: impl Into<String>, outcome: TargetOutcome) {
        let target = target.into();
        if outcome.is_failure() {
            self.failed.insert(target.clone());
            self.failures += 1;
        }
        if outcome == TargetOutcome::Interrupted {
            self.interrupted = true;
        }
        self.outcomes.push(TargetReport {
            target,
            cycle: self.cycles,
            outcome,
        });
    }

    /// Outcomes of the latest cycle, in processing order.
    pub fn outcomes(&self) -> &[TargetReport] {
        &self.outcomes
    }

    /// Latest outcome for `target`.
    pub fn outcome(&self, target: &str) -> Option<&TargetOutcome> {
        self.outcomes
            .iter()
            .rev()
            .find(|r| r.target == target)
            .map(|r| &r.outcome)
    }

    /// Number of cycles started.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Whether any target failed during the run.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Failed target cycles over the whole run.
    pub fn failure_count(&self) -> u64 {
        self.failures
    }

    /// Targets that failed at least once.
    pub fn failed_targets(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(String::as_str)
    }

    /// Whether the run stopped on a shutdown request.
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Mark the run as stopped by a shutdown request.
    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    /// Process exit status: 1 if any target failed, else 0.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }

    /// Records dispatched in the latest cycle.
    pub fn records_dispatched(&self) -> usize {
        self.outcomes
            .iter()
            .map(|r| match r.outcome {
                TargetOutcome::Updated { records, .. } => records,
                _ => 0,
            })
            .sum()
    }
}
