//! Tracing subscriber setup.
//!
//! Headless modes log to stderr. The TUI owns the terminal, so there the log
//! goes to `<cache_dir>/grinder-monitor/monitor.log` instead.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("grinder-monitor")
        .join("monitor.log")
}

fn filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(f) => Ok(f),
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("invalid log level {default_level:?}")),
    }
}

/// Install the global subscriber. Returns the log file when logging to one.
pub fn init(default_level: &str, to_file: bool) -> Result<Option<PathBuf>> {
    let filter = filter(default_level)?;
    if to_file {
        let path = log_file_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create log directory {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;
        Ok(Some(path))
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))?;
        Ok(None)
    }
}
