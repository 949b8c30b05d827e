pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod db;
pub mod entry;
pub mod errors;
pub mod export;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod service;
pub mod views;

use crate::cli::Cli;
use crate::config::ConfigFile;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Entry point for the `beevent` binary. Returns the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    let config = ConfigFile::new(&cli.config);
    if let Err(error) = init_tracing(&log_dir_for(&config)) {
        eprintln!("logging disabled: {}", error);
    }

    match cli::execute(cli) {
        Ok(()) => 0,
        Err(error) => {
            tracing::error!(error = %format!("{:#}", error), "command failed");
            eprintln!("{:#}", error);
            1
        }
    }
}

/// Log directory from the settings file, or `logs/` next to it. Unreadable settings
/// fall back to the default; the command itself reports them.
fn log_dir_for(config: &ConfigFile) -> PathBuf {
    let base_dir = config
        .path()
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    match config.load().ok().and_then(|settings| settings.log_dir) {
        Some(dir) if Path::new(&dir).is_absolute() => PathBuf::from(dir),
        Some(dir) => base_dir.join(dir),
        None => base_dir.join("logs"),
    }
}

fn init_tracing(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
