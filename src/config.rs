//! Layered configuration: CLI flags and environment (resolved by clap) win over
//! the JSON config file, which wins over built-in defaults.

use crate::cli::Cli;
use crate::model::MonitorConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings accepted in the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    pub start_on_launch: Option<bool>,
    pub attach_on_launch: Option<bool>,
}

/// `<config_dir>/grinder-monitor/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("grinder-monitor").join("config.json"))
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
}

/// Load the config file. An explicit path must exist; the default location is
/// skipped when absent.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

/// Build a `MonitorConfig` from CLI arguments layered over the config file.
pub fn build_config(args: &Cli, file: FileConfig) -> Result<MonitorConfig> {
    let poll_interval = args
        .poll_interval
        .map(Duration::from)
        .or(file.poll_interval)
        .unwrap_or(DEFAULT_POLL_INTERVAL);
    if poll_interval.is_zero() {
        anyhow::bail!("poll interval must be greater than zero");
    }
    Ok(MonitorConfig {
        base_url: args
            .base_url
            .clone()
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        token: args.token.clone().or(file.token),
        poll_interval,
        request_timeout: args
            .request_timeout
            .map(Duration::from)
            .or(file.request_timeout)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        user_agent: format!("grinder-monitor/{}", env!("CARGO_PKG_VERSION")),
        start_on_launch: args.start || file.start_on_launch.unwrap_or(false),
        attach_on_launch: !args.no_attach && file.attach_on_launch.unwrap_or(true),
    })
}
