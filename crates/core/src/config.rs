// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch configuration and global tuning knobs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Validation failure for a configuration snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration name must not be blank")]
    BlankName,
    #[error("processor type must not be blank for '{0}'")]
    BlankProcessorType(String),
    #[error("watch dir must not be empty for '{0}'")]
    EmptyWatchDir(String),
    #[error("file patterns must not be empty for '{0}'")]
    EmptyPatterns(String),
    #[error("invalid file pattern '{pattern}' for '{name}'")]
    InvalidPattern { name: String, pattern: String },
    #[error("poll interval {value}ms is below the 1000ms minimum for '{name}'")]
    PollIntervalTooSmall { name: String, value: u64 },
    #[error("max retry attempts must be at least 1")]
    RetryAttemptsTooSmall,
    #[error("retry delay {0}ms is below the 100ms minimum")]
    RetryDelayTooSmall(u64),
}

/// One registered watch: a directory, its destinations, and the processing
/// policy applied to matching files. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub name: String,
    pub processor_type: String,
    pub watch_dir: PathBuf,
    /// Defaults to `<watch_dir>/completed` when absent.
    #[serde(default)]
    pub completed_dir: Option<PathBuf>,
    /// Defaults to `<watch_dir>/error` when absent.
    #[serde(default)]
    pub error_dir: Option<PathBuf>,
    pub file_patterns: Vec<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Processor-specific options, carried opaquely.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_enabled() -> bool {
    true
}

impl WatchConfig {
    /// Destination for successfully processed files.
    pub fn completed_dir(&self) -> PathBuf {
        self.completed_dir
            .clone()
            .unwrap_or_else(|| self.watch_dir.join("completed"))
    }

    /// Destination for failed files.
    pub fn error_dir(&self) -> PathBuf {
        self.error_dir
            .clone()
            .unwrap_or_else(|| self.watch_dir.join("error"))
    }

    /// Degradation queue directory, a sibling of the watch dir.
    pub fn queue_dir(&self) -> PathBuf {
        self.watch_dir.join("..").join("queue")
    }

    /// Field-by-field validation with a specific error per failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::BlankName);
        }
        if self.processor_type.trim().is_empty() {
            return Err(ConfigError::BlankProcessorType(self.name.clone()));
        }
        if self.watch_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyWatchDir(self.name.clone()));
        }
        if self.file_patterns.is_empty() {
            return Err(ConfigError::EmptyPatterns(self.name.clone()));
        }
        for pattern in &self.file_patterns {
            if pattern.trim().is_empty() {
                return Err(ConfigError::InvalidPattern {
                    name: self.name.clone(),
                    pattern: pattern.clone(),
                });
            }
        }
        if self.poll_interval_ms < 1000 {
            return Err(ConfigError::PollIntervalTooSmall {
                name: self.name.clone(),
                value: self.poll_interval_ms,
            });
        }
        Ok(())
    }
}

/// Process-wide tuning shared by all watches.
///
/// The retry fields are explicit overrides: when absent, the named retry
/// policies keep their documented attempt counts and schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Overrides the attempt cap of every retry policy when set (≥1).
    #[serde(default)]
    pub max_retry_attempts: Option<u32>,
    /// Overrides the base delay of every retry policy when set (≥100ms).
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,
    /// Budget for a single processor invocation; exceeding it abandons the
    /// job and leaves the file for the next tick.
    #[serde(default = "default_processing_budget_ms")]
    pub processing_budget_ms: u64,
}

fn default_processing_budget_ms() -> u64 {
    60_000
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: None,
            retry_delay_ms: None,
            processing_budget_ms: default_processing_budget_ms(),
        }
    }
}

impl GlobalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retry_attempts.is_some_and(|n| n < 1) {
            return Err(ConfigError::RetryAttemptsTooSmall);
        }
        if let Some(ms) = self.retry_delay_ms {
            if ms < 100 {
                return Err(ConfigError::RetryDelayTooSmall(ms));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "test-support")]
impl WatchConfig {
    /// Minimal valid configuration rooted at `watch_dir`, for tests.
    pub fn for_tests(name: &str, watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            processor_type: "sql-script".to_string(),
            watch_dir: watch_dir.into(),
            completed_dir: None,
            error_dir: None,
            file_patterns: vec!["*".to_string()],
            poll_interval_ms: 1000,
            enabled: true,
            options: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
