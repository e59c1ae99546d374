//! Incremental index harvester
//!
//! Keeps remote search indexes in sync with an upstream repository.
//!
//! # Usage
//!
//! ```bash
//! harvest-daemon [-d] [-s SECONDS] [-t CURSOR | -q CURSOR] [-dt CURSOR]
//!                [-f FILE] [-l] [-e NAME]... [-ef FILE] [-sn] [-nof FILE] [TARGET]...
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/index-harvester/config.toml)
//! 3. Environment variables (HARVEST_*)
//! 4. CLI flags
//!
//! Exit status is 1 if any target failed or the configuration is unusable.

use std::process::ExitCode;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use harvest_daemon::{init_logging, load_settings, run_harvest, shutdown_signal, Cli};

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = load_settings(&cli)?;
    init_logging(&settings.log_level)?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    let report = run_harvest(&cli, &settings, cancel).await?;
    Ok(ExitCode::from(report.exit_code() as u8))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
