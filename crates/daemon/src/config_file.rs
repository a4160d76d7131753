// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file: TOML → validated snapshot.
//!
//! Every field is validated explicitly so a bad file fails startup with a
//! message naming the offending entry, not a deserializer backtrace.

use intake_core::{ConfigError, GlobalConfig, WatchConfig};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ConfigError),
    #[error("duplicate watch configuration name: {0}")]
    DuplicateName(String),
}

/// Paths the daemon itself uses (lock file, log file).
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonSection {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/intake")
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl DaemonSection {
    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("intaked.pid")
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join("intaked.log")
    }
}

/// The full validated configuration snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default, rename = "watch")]
    pub watches: Vec<WatchConfig>,
}

impl DaemonConfig {
    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DaemonConfig =
            toml::from_str(&content).map_err(|source| ConfigFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigFileError> {
        self.global.validate()?;
        let mut names = HashSet::new();
        for watch in &self.watches {
            watch.validate()?;
            if !names.insert(watch.name.as_str()) {
                return Err(ConfigFileError::DuplicateName(watch.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_file_tests.rs"]
mod tests;
