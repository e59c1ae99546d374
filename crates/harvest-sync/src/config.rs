//! Update loop configuration.

use std::time::Duration;

use harvest_types::{Settings, StartCursor};

/// Settings for the update loop.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Records requested per harvest round-trip
    pub batch_size: usize,
    /// Queue depth at which dispatch blocks
    pub max_queue_depth: usize,
    /// Gate retry interval
    pub backpressure_interval: Duration,
    /// Flush and snapshot poll interval
    pub poll_interval: Duration,
    /// Wait for a flush acknowledgment before saving the checkpoint
    pub wait_for_flush: bool,
    /// Request a snapshot after a successful flush
    pub request_snapshot: bool,
    /// Snapshot path pattern template with `{target}` placeholders
    pub snapshot_pattern: String,
    /// Start timestamp for targets without a checkpoint
    pub default_timestamp: String,
    /// Operator start cursor, honoured on each target's first pass only
    pub start_cursor: Option<StartCursor>,
    /// Repeat cycles until cancelled
    pub daemon: bool,
    /// Sleep between daemon cycles
    pub sleep_interval: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_queue_depth: 500,
            backpressure_interval: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1500),
            wait_for_flush: true,
            request_snapshot: false,
            snapshot_pattern: "{target}|{target}.pa*|{target}.ns*|{target}.h*".to_string(),
            default_timestamp: "2001-01-01".to_string(),
            start_cursor: None,
            daemon: false,
            sleep_interval: Duration::from_secs(30),
        }
    }
}

impl UpdaterConfig {
    /// Build from loaded settings. Run flags stay at their defaults.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            batch_size: settings.batch_size,
            max_queue_depth: settings.max_queue_depth,
            backpressure_interval: settings.backpressure_interval(),
            poll_interval: settings.poll_interval(),
            wait_for_flush: settings.wait_for_flush,
            snapshot_pattern: settings.snapshot_pattern.clone(),
            default_timestamp: settings.default_timestamp.clone(),
            sleep_interval: settings.sleep_interval(),
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth;
        self
    }

    pub fn with_wait_for_flush(mut self, wait: bool) -> Self {
        self.wait_for_flush = wait;
        self
    }

    pub fn with_snapshot(mut self, snapshot: bool) -> Self {
        self.request_snapshot = snapshot;
        self
    }

    pub fn with_default_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.default_timestamp = timestamp.into();
        self
    }

    pub fn with_start_cursor(mut self, cursor: Option<StartCursor>) -> Self {
        self.start_cursor = cursor;
        self
    }

    pub fn with_daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    pub fn with_sleep_interval(mut self, interval: Duration) -> Self {
        self.sleep_interval = interval;
        self
    }
}
