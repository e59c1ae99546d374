//! Harvest daemon library exports.
//!
//! This crate provides the `harvest-daemon` binary.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Configuration, target lists and the harvest run

pub mod cli;
pub mod commands;

pub use cli::{normalize_args, Cli};
pub use commands::{
    collect_exclusions, collect_target_names, init_logging, load_settings, read_list_file,
    resolve_targets, run_harvest, shutdown_signal, updater_config,
};
