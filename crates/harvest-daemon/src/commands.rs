//! Command implementation for the harvest daemon.
//!
//! 1. Validate start cursors (before any network activity)
//! 2. Load configuration (defaults -> file -> env -> CLI)
//! 3. Read target, exclusion and no-optimize lists
//! 4. Open the checkpoint store and build the HTTP collaborators
//! 5. Run update cycles until done or cancelled

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use harvest_client::{HttpHarvester, HttpHarvesterConfig, HttpMessenger, HttpMessengerConfig};
use harvest_storage::open_store;
use harvest_sync::{IncrementalUpdater, RunReport, UpdaterConfig};
use harvest_types::{Settings, StartCursor, Target};

/// Load settings and apply CLI overrides.
pub fn load_settings(cli: &crate::Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    if let Some(secs) = cli.sleep {
        settings.sleep_secs = secs;
    }
    if let Some(ts) = &cli.default_timestamp {
        settings.default_timestamp = ts.clone();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Read a list file: one name per line, trimmed, blank lines ignored.
pub fn read_list_file(path: &Path) -> Result<Vec<String>> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let contents = fs::read_to_string(&expanded)
        .with_context(|| format!("Failed to read list file {}", expanded))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Target names from positional arguments, the target file and `-l`.
///
/// Order is kept; duplicates are dropped.
pub fn collect_target_names(cli: &crate::Cli, settings: &Settings) -> Result<Vec<String>> {
    let mut names = cli.targets.clone();
    if let Some(file) = &cli.target_file {
        names.extend(read_list_file(file)?);
    }
    if cli.local {
        names.extend(settings.local_targets());
    }

    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
    Ok(names)
}

/// Names excluded by `-e` and `-ef`.
pub fn collect_exclusions(cli: &crate::Cli) -> Result<HashSet<String>> {
    let mut excluded: HashSet<String> = cli.exclude.iter().cloned().collect();
    if let Some(file) = &cli.exclude_file {
        excluded.extend(read_list_file(file)?);
    }
    Ok(excluded)
}

/// Resolve target names against settings.
///
/// Returns the resolved targets and the names that could not be resolved,
/// each with the reason.
pub fn resolve_targets(
    names: &[String],
    settings: &Settings,
    excluded: &HashSet<String>,
    no_optimize: &HashSet<String>,
) -> (Vec<Target>, Vec<(String, String)>) {
    let mut targets = Vec::with_capacity(names.len());
    let mut unresolved = Vec::new();
    for name in names {
        if excluded.contains(name) {
            // Excluded targets need no endpoint
            targets.push(Target::new(name.clone(), "", "").with_excluded(true));
            continue;
        }
        match settings.resolve_target(name) {
            Ok(target) => targets.push(target.with_skip_optimize(no_optimize.contains(name))),
            Err(e) => unresolved.push((name.clone(), e.to_string())),
        }
    }
    (targets, unresolved)
}

/// Updater configuration from settings and run flags.
pub fn updater_config(
    cli: &crate::Cli,
    settings: &Settings,
    start_cursor: Option<StartCursor>,
) -> UpdaterConfig {
    UpdaterConfig::from_settings(settings)
        .with_daemon(cli.daemon)
        .with_snapshot(cli.snapshot)
        .with_start_cursor(start_cursor)
        .with_sleep_interval(Duration::from_secs(settings.sleep_secs))
}

/// Run the harvester to completion.
///
/// Errors are configuration problems detected before the first cycle.
/// Per-target failures are reported in the returned `RunReport`.
pub async fn run_harvest(
    cli: &crate::Cli,
    settings: &Settings,
    cancel: CancellationToken,
) -> Result<RunReport> {
    let start_cursor = StartCursor::from_flags(cli.timestamp.clone(), cli.sequence.clone())?;

    let names = collect_target_names(cli, settings)?;
    if names.is_empty() {
        bail!("No targets given; pass target names, -f <file> or -l (see --help)");
    }
    let excluded = collect_exclusions(cli)?;
    let no_optimize: HashSet<String> = match &cli.no_optimize_file {
        Some(file) => read_list_file(file)?.into_iter().collect(),
        None => HashSet::new(),
    };
    let (targets, unresolved) = resolve_targets(&names, settings, &excluded, &no_optimize);

    let checkpoint_dir = settings.expanded_checkpoint_dir();
    let store = open_store(settings.checkpoint_backend, &checkpoint_dir)
        .context("Failed to open checkpoint store")?;
    let harvester = HttpHarvester::new(HttpHarvesterConfig::from_settings(&settings.harvester))
        .context("Failed to build harvester client")?;
    let messenger = HttpMessenger::new(HttpMessengerConfig::from_settings(&settings.messenger))
        .context("Failed to build messenger client")?;

    info!("Index harvester starting...");
    info!("Configuration:");
    info!("  Checkpoints: {:?} ({})", checkpoint_dir, store.name());
    info!("  Targets: {}", targets.len());
    info!("  Batch size: {}", settings.batch_size);
    info!("  Max queue depth: {}", settings.max_queue_depth);
    info!("  Daemon: {}", cli.daemon);

    let config = updater_config(cli, settings, start_cursor);
    let mut updater = IncrementalUpdater::new(
        Arc::new(harvester),
        Arc::new(messenger),
        store,
        config,
    )
    .with_unresolved_targets(unresolved)
    .with_cancellation(cancel);

    let report = updater.run(&targets).await;

    if report.has_failures() {
        let failed: Vec<&str> = report.failed_targets().collect();
        warn!(failed = ?failed, "Run finished with failures");
    } else {
        info!(cycles = report.cycles(), "Run finished");
    }
    Ok(report)
}

/// Resolve when SIGINT or SIGTERM arrives.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use harvest_types::{ConfigError, TargetSettings};
    use tempfile::TempDir;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.harvester.url_template = Some("http://gw/{target}".into());
        settings.messenger.index_host = Some("idx1".into());
        settings.targets.insert(
            "zhwiki".into(),
            TargetSettings {
                index_host: Some("idx9".into()),
                local: true,
                ..Default::default()
            },
        );
        settings
    }

    #[test]
    fn test_read_list_file_trims_and_skips_blanks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("targets.lst");
        fs::write(&path, "enwiki\n  dewiki  \n\n\t\nfrwiki\n").unwrap();

        assert_eq!(
            read_list_file(&path).unwrap(),
            vec!["enwiki", "dewiki", "frwiki"]
        );
    }

    #[test]
    fn test_missing_list_file_is_error() {
        assert!(read_list_file(Path::new("/nonexistent/targets.lst")).is_err());
    }

    #[test]
    fn test_collect_targets_merges_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("targets.lst");
        fs::write(&path, "dewiki\nenwiki\n").unwrap();

        let cli = Cli {
            targets: vec!["enwiki".into()],
            target_file: Some(path),
            local: true,
            ..Default::default()
        };
        let names = collect_target_names(&cli, &settings()).unwrap();
        assert_eq!(names, vec!["enwiki", "dewiki", "zhwiki"]);
    }

    #[test]
    fn test_resolve_targets_flags() {
        let names: Vec<String> = vec!["enwiki".into(), "dewiki".into(), "zhwiki".into()];
        let excluded: HashSet<String> = ["dewiki".to_string()].into_iter().collect();
        let no_optimize: HashSet<String> = ["zhwiki".to_string()].into_iter().collect();

        let (targets, unresolved) = resolve_targets(&names, &settings(), &excluded, &no_optimize);

        assert!(unresolved.is_empty());
        assert_eq!(targets[0].harvest_url, "http://gw/enwiki");
        assert!(!targets[0].excluded);
        assert!(targets[1].excluded);
        assert_eq!(targets[2].index_host, "idx9");
        assert!(targets[2].skip_optimize);
    }

    #[test]
    fn test_unresolvable_target_is_reported() {
        let names = vec!["enwiki".to_string()];
        let (targets, unresolved) =
            resolve_targets(&names, &Settings::default(), &HashSet::new(), &HashSet::new());
        assert!(targets.is_empty());
        assert_eq!(unresolved[0].0, "enwiki");
    }

    #[tokio::test]
    async fn test_conflicting_cursors_rejected_first() {
        let cli = Cli {
            timestamp: Some("2024-01-01".into()),
            sequence: Some("42".into()),
            targets: vec!["enwiki".into()],
            ..Default::default()
        };
        let err = run_harvest(&cli, &settings(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ConflictingStartCursors)
        ));
    }

    #[tokio::test]
    async fn test_no_targets_is_error() {
        let err = run_harvest(&Cli::default(), &settings(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No targets"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolved_target_fails_every_daemon_cycle() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            checkpoint_dir: dir.path().to_string_lossy().into_owned(),
            sleep_secs: 30,
            ..Default::default()
        };
        let cli = Cli {
            daemon: true,
            targets: vec!["xxwiki".into()],
            ..Default::default()
        };

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(65)).await;
            trigger.cancel();
        });

        let report = run_harvest(&cli, &settings, cancel).await.unwrap();

        assert_eq!(report.cycles(), 3);
        assert_eq!(report.failure_count(), 3);
        assert!(report.was_interrupted());
        assert!(report.outcome("xxwiki").unwrap().is_failure());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_updater_config_from_flags() {
        let cli = Cli {
            daemon: true,
            snapshot: true,
            ..Default::default()
        };
        let mut settings = settings();
        settings.sleep_secs = 90;
        let config = updater_config(&cli, &settings, Some(StartCursor::Sequence("7".into())));

        assert!(config.daemon);
        assert!(config.request_snapshot);
        assert_eq!(config.sleep_interval, Duration::from_secs(90));
        assert_eq!(config.start_cursor, Some(StartCursor::Sequence("7".into())));
    }
}
