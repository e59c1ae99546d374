//! Harvesting and coordination engine for the index harvester.
//!
//! Keeps a remote search index in sync with an upstream repository by
//! harvesting change records and forwarding them to the indexer.
//!
//! ## Key Components
//!
//! - [`Harvester`] / [`Messenger`]: collaborator traits for the upstream
//!   source and the remote indexer
//! - [`ModeRegistry`]: run-scoped timestamp/sequence mode resolution
//! - [`BatchFetcher`]: pagination and single-record re-fetch
//! - [`BackpressureGate`]: blocks dispatch while the indexer queue is full
//! - [`Dispatcher`]: gated submission plus partial-record resolution
//! - [`CompletionHandshake`]: flush then snapshot acknowledgment
//! - [`IncrementalUpdater`]: the per-target update loop
//! - [`RunReport`]: per-target outcomes and the run's exit status
//!
//! ## Delivery
//!
//! A target's checkpoint only advances after every record of the cycle was
//! accepted and, when enabled, flushed. A crash in between re-delivers the
//! same records on the next run.
//!
//! ## Example
//!
//! ```ignore
//! use harvest_sync::{IncrementalUpdater, UpdaterConfig};
//!
//! let mut updater = IncrementalUpdater::new(harvester, messenger, store, UpdaterConfig::default());
//! let report = updater.run(&targets).await;
//! std::process::exit(report.exit_code());
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod gate;
pub mod handshake;
pub mod harvester;
pub mod messenger;
pub mod mock;
pub mod mode;
pub mod poll;
pub mod report;
pub mod updater;

pub use config::UpdaterConfig;
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::SyncError;
pub use fetcher::BatchFetcher;
pub use gate::BackpressureGate;
pub use handshake::{CompletionHandshake, HandshakeOutcome};
pub use harvester::Harvester;
pub use messenger::Messenger;
pub use mode::{ModeRegistry, StartPlan};
pub use poll::{pause, poll_until};
pub use report::{RunReport, TargetOutcome, TargetReport};
pub use updater::IncrementalUpdater;
