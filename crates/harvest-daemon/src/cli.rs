//! CLI argument parsing for the harvest daemon.
//!
//! The legacy switches `-dt`, `-ef`, `-sn`, `-nof` and `-configfile` are
//! rewritten to their long forms before clap sees them.

use std::path::PathBuf;

use clap::Parser;

/// Incremental index harvester
///
/// Harvests change records for each target and forwards them to the
/// remote indexer, advancing a per-target checkpoint after each
/// successful cycle.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "harvest-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Keep running, sleeping between cycles
    #[arg(short = 'd', long = "daemon")]
    pub daemon: bool,

    /// Seconds to sleep between cycles (default 30)
    #[arg(short = 's', long = "sleep", value_name = "SECONDS")]
    pub sleep: Option<u64>,

    /// Start timestamp, overrides checkpoints on the first pass
    #[arg(short = 't', long = "timestamp", value_name = "CURSOR")]
    pub timestamp: Option<String>,

    /// Start sequence number, overrides checkpoints on the first pass
    #[arg(short = 'q', long = "sequence", value_name = "CURSOR")]
    pub sequence: Option<String>,

    /// Timestamp used for targets without a checkpoint (default 2001-01-01)
    #[arg(long = "dt", value_name = "CURSOR")]
    pub default_timestamp: Option<String>,

    /// File listing targets, one per line
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub target_file: Option<PathBuf>,

    /// Include every target marked local in the configuration
    #[arg(short = 'l', long = "local")]
    pub local: bool,

    /// Exclude a target (repeatable)
    #[arg(short = 'e', long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// File listing targets to exclude
    #[arg(long = "ef", value_name = "FILE")]
    pub exclude_file: Option<PathBuf>,

    /// Request a snapshot after each successful flush
    #[arg(long = "sn")]
    pub snapshot: bool,

    /// File listing targets whose snapshots skip optimization
    #[arg(long = "nof", value_name = "FILE")]
    pub no_optimize_file: Option<PathBuf>,

    /// Wait for flush notifications (already the default)
    #[arg(short = 'n', hide = true)]
    pub notify: bool,

    /// Path to config file (overrides default ~/.config/index-harvester/config.toml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Targets to harvest
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

impl Cli {
    /// Parse the process arguments, accepting legacy switches.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args()))
    }
}

/// Rewrite legacy multi-letter single-dash switches to clap long options.
pub fn normalize_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| match arg.as_str() {
            "-dt" => "--dt".to_string(),
            "-ef" => "--ef".to_string(),
            "-sn" => "--sn".to_string(),
            "-nof" => "--nof".to_string(),
            "-configfile" => "--config".to_string(),
            _ => arg,
        })
        .collect()
}
