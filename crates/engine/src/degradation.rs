// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful degradation: when a sink is unavailable, incoming files are
//! diverted to a filesystem queue and replayed once the sink recovers.
//!
//! Queue entries are named `<yyyyMMdd_HHmmss>_<original>`; the timestamp
//! prefix is informational and the original name is recovered as the suffix
//! after the second underscore.

use crate::breaker::{BreakerSet, BreakerState};
use crate::file_manager::{format_timestamp, move_file, next_free_path};
use intake_core::{Clock, MetricsSink, ProcessError, WatchConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Prefix for files that failed restoration and were parked in errorDir.
const RESTORE_FAILED_PREFIX: &str = "queue_restore_failed_";

/// Per-component degradation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradationState {
    pub component: String,
    pub degraded: bool,
    pub reason: Option<String>,
    pub since_ms: Option<u64>,
}

/// Result of a queue replay pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: usize,
    pub failed: usize,
}

/// Tracks component availability and owns the filesystem queue.
pub struct DegradationMonitor<C: Clock> {
    clock: C,
    metrics: MetricsSink,
    states: Mutex<HashMap<String, DegradationState>>,
    global: AtomicBool,
}

impl<C: Clock> DegradationMonitor<C> {
    pub fn new(clock: C, metrics: MetricsSink) -> Self {
        Self {
            clock,
            metrics,
            states: Mutex::new(HashMap::new()),
            global: AtomicBool::new(false),
        }
    }

    /// Mark a component degraded. Idempotent: repeated entries while already
    /// degraded do not double-count metrics.
    pub fn enter(&self, component: &str, reason: &str) {
        let mut states = self.states.lock();
        let state = states
            .entry(component.to_string())
            .or_insert_with(|| DegradationState {
                component: component.to_string(),
                degraded: false,
                reason: None,
                since_ms: None,
            });
        if state.degraded {
            return;
        }
        state.degraded = true;
        state.reason = Some(reason.to_string());
        state.since_ms = Some(self.clock.epoch_ms());
        drop(states);

        tracing::warn!(component, reason, "entering degraded mode");
        self.metrics
            .incr("degradation.entered", &[("component", component)]);
        if component == "database" {
            self.global.store(true, Ordering::SeqCst);
        }
    }

    /// Mark a component healthy again. Idempotent.
    pub fn exit(&self, component: &str) {
        let mut states = self.states.lock();
        let Some(state) = states.get_mut(component) else {
            return;
        };
        if !state.degraded {
            return;
        }
        state.degraded = false;
        state.reason = None;
        state.since_ms = None;
        drop(states);

        tracing::info!(component, "leaving degraded mode");
        self.metrics
            .incr("degradation.exited", &[("component", component)]);
        if component == "database" {
            self.global.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_degraded(&self, component: &str) -> bool {
        self.states
            .lock()
            .get(component)
            .is_some_and(|s| s.degraded)
    }

    /// Set while the database component is degraded.
    pub fn global_degradation(&self) -> bool {
        self.global.load(Ordering::SeqCst)
    }

    /// Snapshot of every component's state.
    pub fn states(&self) -> Vec<DegradationState> {
        let mut states: Vec<_> = self.states.lock().values().cloned().collect();
        states.sort_by(|a, b| a.component.cmp(&b.component));
        states
    }

    /// Derive degradation from breaker states: open means degraded,
    /// closed means healthy. Half-open stays degraded until trials pass.
    pub fn sync_with_breakers(&self, breakers: &BreakerSet<C>) {
        for (name, state) in breakers.states() {
            match state {
                BreakerState::Open => self.enter(name, "circuit open"),
                BreakerState::HalfOpen => {}
                BreakerState::Closed => self.exit(name),
            }
        }
    }

    /// Divert an incoming file to the queue because the database sink is
    /// unavailable. Returns the queued path.
    pub fn queue_file(&self, path: &Path, cfg: &WatchConfig) -> Result<PathBuf, ProcessError> {
        let queue_dir = cfg.queue_dir();
        let original = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ProcessError::file_system("file has no name"))?;
        let queued_name = format!("{}_{original}", format_timestamp(self.clock.epoch_ms()));

        let result = (|| {
            fs::create_dir_all(&queue_dir)?;
            let dest = next_free_path(&queue_dir, &queued_name);
            move_file(path, &dest)?;
            Ok::<_, std::io::Error>(dest)
        })();

        match result {
            Ok(dest) => {
                tracing::info!(
                    file = %path.display(),
                    queued = %dest.display(),
                    "queued file during database degradation"
                );
                self.metrics
                    .incr("files.queued", &[("reason", "database_unavailable")]);
                Ok(dest)
            }
            Err(e) => {
                self.metrics.incr("files.queue_failed", &[]);
                Err(ProcessError::FileSystem {
                    message: format!("failed to queue {}: {e}", path.display()),
                    source: Some(e),
                })
            }
        }
    }

    /// Replay queued files back into the watch directory under their
    /// original names. No-op while the database is still degraded. Files
    /// that cannot be restored are parked in errorDir with a
    /// `queue_restore_failed_` prefix.
    pub fn process_queued(&self, cfg: &WatchConfig) -> Result<RestoreSummary, ProcessError> {
        let mut summary = RestoreSummary::default();
        if self.is_degraded("database") {
            return Ok(summary);
        }
        let queue_dir = cfg.queue_dir();
        let entries = match fs::read_dir(&queue_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(summary),
            Err(e) => return Err(e.into()),
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let queued_name = entry.file_name().to_string_lossy().into_owned();
            let original = original_name(&queued_name);
            let dest = next_free_path(&cfg.watch_dir, original);

            match move_file(&path, &dest) {
                Ok(()) => {
                    summary.restored += 1;
                    self.metrics.incr("files.restored_from_queue", &[]);
                    tracing::info!(file = %dest.display(), "restored file from queue");
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        file = %path.display(),
                        error = %e,
                        "failed to restore queued file"
                    );
                    let error_dir = cfg.error_dir();
                    let parked = (|| {
                        fs::create_dir_all(&error_dir)?;
                        let name = format!("{RESTORE_FAILED_PREFIX}{queued_name}");
                        move_file(&path, &next_free_path(&error_dir, &name))
                    })();
                    if let Err(park_err) = parked {
                        tracing::error!(
                            file = %path.display(),
                            error = %park_err,
                            "failed to park unrestorable queued file"
                        );
                    }
                }
            }
        }
        Ok(summary)
    }
}

/// The original filename is the suffix after the second underscore of the
/// queued name; a name without the timestamp prefix is returned whole.
fn original_name(queued: &str) -> &str {
    let mut underscores = 0;
    for (i, b) in queued.bytes().enumerate() {
        if b == b'_' {
            underscores += 1;
            if underscores == 2 {
                let rest = &queued[i + 1..];
                if !rest.is_empty() {
                    return rest;
                }
                break;
            }
        }
    }
    queued
}

#[cfg(test)]
#[path = "degradation_tests.rs"]
mod tests;
