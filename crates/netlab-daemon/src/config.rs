// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: where its event log lives, what it listens on,
//! and how often its background supervisors tick. Loaded from an
//! optional TOML file and defaulted otherwise, so the binary runs with
//! zero configuration in development.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

fn default_wal_path() -> PathBuf {
    PathBuf::from("/var/lib/netlab/wal.jsonl")
}

fn default_ws_listen_addr() -> String {
    "0.0.0.0:7070".to_string()
}

fn default_callback_listen_addr() -> String {
    "0.0.0.0:7071".to_string()
}

fn default_health_check_interval_secs() -> u64 {
    15
}

fn default_link_reconcile_interval_secs() -> u64 {
    60
}

fn default_job_health_monitor_interval_secs() -> u64 {
    30
}

fn default_log_dir() -> Option<PathBuf> {
    None
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_wal_path")]
    pub wal_path: PathBuf,
    #[serde(default = "default_ws_listen_addr")]
    pub ws_listen_addr: String,
    #[serde(default = "default_callback_listen_addr")]
    pub callback_listen_addr: String,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_link_reconcile_interval_secs")]
    pub link_reconcile_interval_secs: u64,
    #[serde(default = "default_job_health_monitor_interval_secs")]
    pub job_health_monitor_interval_secs: u64,
    /// When set, logs are additionally written as daily-rotated files
    /// under this directory (non-blocking writer); stdout logging always
    /// stays on regardless.
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wal_path: default_wal_path(),
            ws_listen_addr: default_ws_listen_addr(),
            callback_listen_addr: default_callback_listen_addr(),
            health_check_interval_secs: default_health_check_interval_secs(),
            link_reconcile_interval_secs: default_link_reconcile_interval_secs(),
            job_health_monitor_interval_secs: default_job_health_monitor_interval_secs(),
            log_dir: default_log_dir(),
        }
    }
}

impl Config {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    pub fn link_reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.link_reconcile_interval_secs)
    }

    pub fn job_health_monitor_interval(&self) -> Duration {
        Duration::from_secs(self.job_health_monitor_interval_secs)
    }

    /// Loads `path` if it exists; a missing config file is not an error,
    /// the daemon just runs with defaults. `NETLABD_CONFIG` overrides
    /// `path` when set.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = std::env::var_os("NETLABD_CONFIG").map(PathBuf::from).or(path);
        let Some(path) = path else { return Ok(Self::default()) };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e.to_string()))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(path, e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0:?}: {1}")]
    Read(PathBuf, String),
    #[error("failed to parse config file {0:?}: {1}")]
    Parse(PathBuf, String),
}
