// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-configuration processing statistics.

use crate::ProcessingStatus;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Worker state as reported by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatcherStatus {
    Idle,
    Running,
    Paused,
    Stopped,
    Error,
}

impl fmt::Display for WatcherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatcherStatus::Idle => "IDLE",
            WatcherStatus::Running => "RUNNING",
            WatcherStatus::Paused => "PAUSED",
            WatcherStatus::Stopped => "STOPPED",
            WatcherStatus::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// Counters for one configuration. All counters are monotonically
/// non-decreasing for the lifetime of the process; only the status cell
/// moves both ways.
#[derive(Debug, Default)]
pub struct ConfigStats {
    total_processed: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    last_processing_ms: AtomicU64,
    status: Mutex<Option<WatcherStatus>>,
}

impl ConfigStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a terminal processing outcome.
    pub fn record(&self, status: ProcessingStatus, at_epoch_ms: u64) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        match status {
            ProcessingStatus::Success => self.successful.fetch_add(1, Ordering::Relaxed),
            ProcessingStatus::Failure => self.failed.fetch_add(1, Ordering::Relaxed),
            ProcessingStatus::Skipped => self.skipped.fetch_add(1, Ordering::Relaxed),
        };
        self.last_processing_ms.store(at_epoch_ms, Ordering::Relaxed);
    }

    pub fn set_status(&self, status: WatcherStatus) {
        *self.status.lock() = Some(status);
    }

    pub fn status(&self) -> Option<WatcherStatus> {
        *self.status.lock()
    }

    pub fn snapshot(&self, name: &str) -> StatsSnapshot {
        StatsSnapshot {
            name: name.to_string(),
            total_processed: self.total_processed.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            last_processing_ms: match self.last_processing_ms.load(Ordering::Relaxed) {
                0 => None,
                ms => Some(ms),
            },
            current_status: self.status().unwrap_or(WatcherStatus::Idle),
        }
    }
}

/// Point-in-time statistics DTO for the control surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub name: String,
    pub total_processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub skipped: u64,
    pub last_processing_ms: Option<u64>,
    pub current_status: WatcherStatus,
}

impl StatsSnapshot {
    /// Fold per-config snapshots into a global aggregate.
    pub fn aggregate(snapshots: &[StatsSnapshot]) -> StatsSnapshot {
        let mut total = StatsSnapshot {
            name: "global".to_string(),
            total_processed: 0,
            successful: 0,
            failed: 0,
            skipped: 0,
            last_processing_ms: None,
            current_status: WatcherStatus::Idle,
        };
        for s in snapshots {
            total.total_processed += s.total_processed;
            total.successful += s.successful;
            total.failed += s.failed;
            total.skipped += s.skipped;
            total.last_processing_ms = total.last_processing_ms.max(s.last_processing_ms);
        }
        total
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
