//! Memobot application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the SQLite store
//! 3. Build the Telegram client, dispatcher and ingestion cycle
//! 4. Run one cycle (or one per `--watch` interval) and print each outcome
//!    as JSON
//!
//! Exit codes: 0 completed or disabled, 1 partial, 2 aborted.

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use memobot_bot::{
    provider_from_config, BotError, CycleOutcome, Dispatcher, IngestCycle, TelegramClient,
};
use memobot_core::config::MemobotConfig;
use memobot_core::error::MemobotError;
use memobot_storage::{BotStore, Database, SqliteStore};

use cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Load the config file (defaults if it does not exist), then apply
/// environment and CLI overrides and validate.
fn load_config(args: &CliArgs, path: &Path) -> Result<MemobotConfig, MemobotError> {
    let mut config = MemobotConfig::load_or_default(path)?;
    config.apply_env_overrides();
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    config.validate()?;
    Ok(config)
}

fn init_tracing(default_level: &str, cli_level: Option<&str>) {
    // --log-level beats RUST_LOG, which beats the config file.
    let filter = match cli_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_outcome(outcome: &CycleOutcome) {
    match serde_json::to_string(outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Failed to serialize cycle outcome"),
    }
}

fn build_cycle(config: &MemobotConfig) -> Result<IngestCycle, MemobotError> {
    let data_dir = resolve_data_dir(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir).map_err(|e| {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        e
    })?;

    let db_path = data_dir.join("memobot.db");
    let db = Arc::new(Database::new(&db_path).map_err(BotError::from)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let store: Arc<dyn BotStore> = Arc::new(SqliteStore::new(db));
    let telegram = Arc::new(TelegramClient::new(&config.telegram).map_err(BotError::from)?);
    let answers = provider_from_config(&config.ask);
    let dispatcher = Dispatcher::new(Arc::clone(&store), answers, config);

    Ok(IngestCycle::new(
        store,
        telegram.clone(),
        telegram,
        dispatcher,
        &config.cycle,
    ))
}

/// Run a cycle every `every` until Ctrl-C. Cycles never overlap.
async fn watch(cycle: &IngestCycle, every: Duration) -> ExitCode {
    tracing::info!(interval_secs = every.as_secs(), "Watch mode started");
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let outcome = cycle.run().await;
                print_outcome(&outcome);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping watch mode");
                return ExitCode::SUCCESS;
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_file = args.resolve_config_path();
    let loaded = load_config(&args, &config_file);

    let log_level = loaded
        .as_ref()
        .map(|c| c.general.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&log_level, args.resolve_log_level().as_deref());

    tracing::info!("Starting Memobot v{}", env!("CARGO_PKG_VERSION"));

    let config = match loaded {
        Ok(config) => {
            tracing::info!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Err(e) => {
            tracing::error!(path = %config_file.display(), error = %e, "Invalid configuration");
            let outcome = CycleOutcome::aborted(None, e.to_string());
            print_outcome(&outcome);
            return ExitCode::from(outcome.status.exit_code());
        }
    };

    if !config.cycle.enabled {
        tracing::info!("Ingestion cycle disabled in configuration");
        let outcome = CycleOutcome::disabled();
        print_outcome(&outcome);
        return ExitCode::from(outcome.status.exit_code());
    }

    let cycle = match build_cycle(&config) {
        Ok(cycle) => cycle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start");
            let outcome = CycleOutcome::aborted(None, e.to_string());
            print_outcome(&outcome);
            return ExitCode::from(outcome.status.exit_code());
        }
    };

    match args.watch_interval() {
        Some(every) => watch(&cycle, every).await,
        None => {
            let outcome = cycle.run().await;
            print_outcome(&outcome);
            ExitCode::from(outcome.status.exit_code())
        }
    }
}
