// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! State directory and configuration.
//!
//! Everything `bsync` keeps lives under one state directory: the primary
//! database, the audit log directory, the credential key file, the log file,
//! and an optional `config.toml` that relocates any of them.
//!
//! ```toml
//! database = "/srv/hr/attendance.db"
//! audit_dir = "audit"
//! connect_timeout_secs = 10
//! ```
//!
//! Relative paths are resolved against the state directory.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "attendance.db";
const AUDIT_DIR_NAME: &str = "audit";
const KEY_FILE_NAME: &str = "location.key";
const LOG_FILE_NAME: &str = "bsync.log";
const APP_DIR_NAME: &str = "bsync";

/// Configuration stored in `<state_dir>/config.toml`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub audit_dir: Option<PathBuf>,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// Bound on reaching a location before a run or test gives up.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: None,
            audit_dir: None,
            key_file: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the state directory; a missing file yields defaults.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let config_path = state_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        if config.connect_timeout_secs == 0 {
            return Err(Error::Config(
                "connect_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn database_path(&self, state_dir: &Path) -> PathBuf {
        resolve(state_dir, self.database.as_deref(), DB_FILE_NAME)
    }

    pub fn audit_dir(&self, state_dir: &Path) -> PathBuf {
        resolve(state_dir, self.audit_dir.as_deref(), AUDIT_DIR_NAME)
    }

    pub fn key_file(&self, state_dir: &Path) -> PathBuf {
        resolve(state_dir, self.key_file.as_deref(), KEY_FILE_NAME)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn resolve(state_dir: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => state_dir.join(path),
        None => state_dir.join(default_name),
    }
}

/// Path of the tracing log file inside the state directory.
pub fn log_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOG_FILE_NAME)
}

/// Resolves the state directory: `--state-dir`, then `BSYNC_STATE_DIR`,
/// then the platform data directory.
pub fn state_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    pick_state_dir(flag, env::state_dir(), dirs::data_local_dir())
}

fn pick_state_dir(
    flag: Option<PathBuf>,
    from_env: Option<PathBuf>,
    data_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    flag.or(from_env)
        .or_else(|| data_dir.map(|d| d.join(APP_DIR_NAME)))
        .ok_or(Error::NoStateDir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
