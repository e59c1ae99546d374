//! Incremental update loop.
//!
//! Per target per cycle: load checkpoint, plan the start cursor, fetch,
//! dispatch page by page through the backpressure gate, run the completion
//! handshake, then save the advanced checkpoint. Any error abandons the
//! target's cycle with its checkpoint untouched and moves on to the next
//! target.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use harvest_storage::CheckpointStore;
use harvest_types::Target;

use crate::config::UpdaterConfig;
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::error::SyncError;
use crate::fetcher::BatchFetcher;
use crate::gate::BackpressureGate;
use crate::handshake::CompletionHandshake;
use crate::harvester::Harvester;
use crate::messenger::Messenger;
use crate::mode::ModeRegistry;
use crate::poll::pause;
use crate::report::{RunReport, TargetOutcome};

/// Drives update cycles over a list of targets.
///
/// Targets are processed strictly one after another.
pub struct IncrementalUpdater {
    harvester: Arc<dyn Harvester>,
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn CheckpointStore>,
    config: UpdaterConfig,
    gate: BackpressureGate,
    handshake: CompletionHandshake,
    registry: ModeRegistry,
    /// Targets that completed a cycle in this run
    completed: HashSet<String>,
    /// Names with no known endpoint, failed again every cycle
    unresolved: Vec<(String, String)>,
    cancel: CancellationToken,
}

impl IncrementalUpdater {
    pub fn new(
        harvester: Arc<dyn Harvester>,
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn CheckpointStore>,
        config: UpdaterConfig,
    ) -> Self {
        let gate = BackpressureGate::new(config.max_queue_depth, config.backpressure_interval);
        let handshake = CompletionHandshake::new(
            config.wait_for_flush,
            config.request_snapshot,
            config.poll_interval,
            config.snapshot_pattern.clone(),
        );
        Self {
            harvester,
            messenger,
            store,
            config,
            gate,
            handshake,
            registry: ModeRegistry::new(),
            completed: HashSet::new(),
            unresolved: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Names that could not be turned into targets, each with the reason.
    ///
    /// Every cycle records them as failed before processing the targets.
    pub fn with_unresolved_targets(
        mut self,
        unresolved: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.unresolved = unresolved.into_iter().collect();
        self
    }

    /// Token that stops the run at the next suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The run's mode registry.
    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    /// Whether `target` has not yet completed a cycle in this run.
    pub fn is_first_pass(&self, target: &str) -> bool {
        !self.completed.contains(target)
    }

    /// Run cycles over `targets`: once, or until cancelled in daemon mode.
    pub async fn run(&mut self, targets: &[Target]) -> RunReport {
        let mut report = RunReport::new();
        loop {
            let cycle = report.begin_cycle();
            info!(cycle = cycle, targets = targets.len(), "Starting update cycle");
            self.run_cycle(targets, &mut report).await;
            info!(
                cycle = cycle,
                records = report.records_dispatched(),
                failed = report.has_failures(),
                "Update cycle finished"
            );

            if !self.config.daemon || report.was_interrupted() {
                break;
            }
            debug!(
                secs = self.config.sleep_interval.as_secs(),
                "Sleeping before next cycle"
            );
            if pause(self.config.sleep_interval, &self.cancel).await.is_err() {
                info!("Shutdown requested, stopping");
                report.mark_interrupted();
                break;
            }
        }
        report
    }

    /// Process every target once, recording outcomes into `report`.
    pub async fn run_cycle(&mut self, targets: &[Target], report: &mut RunReport) {
        for (name, reason) in &self.unresolved {
            warn!(target = %name, reason = %reason, "Target could not be resolved");
            report.record(
                name.clone(),
                TargetOutcome::Failed {
                    reason: reason.clone(),
                },
            );
        }
        for target in targets {
            let outcome = self.update_target(target).await;
            let interrupted = outcome == TargetOutcome::Interrupted;
            report.record(target.name.clone(), outcome);
            if interrupted {
                break;
            }
        }
    }

    /// Run one cycle for one target. Never fails; errors become outcomes.
    pub async fn update_target(&mut self, target: &Target) -> TargetOutcome {
        if target.excluded {
            debug!(target = %target.name, "Target excluded, skipping");
            return TargetOutcome::Excluded;
        }
        if self.cancel.is_cancelled() {
            return TargetOutcome::Interrupted;
        }

        match self.try_update(target).await {
            Ok(outcome) => outcome,
            Err(SyncError::Cancelled) => {
                info!(target = %target.name, "Interrupted, checkpoint left unchanged");
                TargetOutcome::Interrupted
            }
            Err(e) => {
                warn!(
                    target = %target.name,
                    error = %e,
                    "Update failed, checkpoint left unchanged"
                );
                TargetOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_update(&mut self, target: &Target) -> Result<TargetOutcome, SyncError> {
        let mut checkpoint = self.store.load(&target.name)?;

        let explicit = if self.is_first_pass(&target.name) {
            self.config.start_cursor.as_ref()
        } else {
            None
        };
        let plan = self
            .registry
            .plan_start(&checkpoint, explicit, &self.config.default_timestamp);
        info!(
            target = %target.name,
            cursor = %plan.cursor,
            mode = %plan.mode,
            "Harvesting"
        );

        let mut fetcher = BatchFetcher::new(
            self.harvester.as_ref(),
            target,
            self.config.batch_size,
        );
        let mut records = fetcher.fetch_next(&plan.cursor, plan.mode).await?;
        if records.is_empty() {
            debug!(target = %target.name, "No changes");
            return Ok(TargetOutcome::NoChanges);
        }

        let mode = if plan.is_probe() {
            self.registry.resolve_from_probe(fetcher.supports_sequence())
        } else {
            plan.mode
        };

        let dispatcher = Dispatcher::new(self.messenger.as_ref(), &self.gate, &self.cancel);
        let mut stats = DispatchStats::default();
        loop {
            let batch = dispatcher.dispatch(&fetcher, &records, target).await?;
            stats.merge(&batch);
            if !fetcher.has_more() {
                break;
            }
            records = fetcher.fetch_more().await?;
        }
        info!(
            target = %target.name,
            records = stats.records,
            partials = stats.partials,
            pages = fetcher.pages(),
            "Dispatched changes"
        );

        self.handshake
            .complete(self.messenger.as_ref(), target, &self.cancel)
            .await?;

        checkpoint.advance(mode, fetcher.response_cursor(), stats.records as u64);
        let checkpoint_saved = match self.store.save(&target.name, &checkpoint) {
            Ok(()) => {
                info!(
                    target = %target.name,
                    mode = %mode,
                    timestamp = ?checkpoint.timestamp,
                    sequence = ?checkpoint.sequence,
                    "Checkpoint saved"
                );
                true
            }
            Err(e) => {
                warn!(
                    target = %target.name,
                    error = %e,
                    "Failed to save checkpoint, next cycle repeats this work"
                );
                false
            }
        };
        self.completed.insert(target.name.clone());

        Ok(TargetOutcome::Updated {
            records: stats.records,
            partials: stats.partials,
            checkpoint_saved,
        })
    }
}
