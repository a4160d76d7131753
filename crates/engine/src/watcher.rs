// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The watcher registry and its per-configuration workers.
//!
//! Each registered, enabled configuration gets one long-lived worker task:
//! a cooperative loop that scans the watch directory, dispatches matching
//! files in lexicographic order through the pipeline, and sleeps out the
//! rest of the poll interval. Workers never die from job errors; they stop
//! only on unregister, replacement, or shutdown.

use crate::error::EngineError;
use crate::file_manager::is_in_use_name;
use crate::pipeline::{JobOutcome, JobPipeline};
use intake_core::{
    Clock, ConfigStats, CorrelationId, FilePatterns, GlobalConfig, HealthEntry, HealthReport,
    IdGen, MetricsSink, ProcessingJob, StatsSnapshot, WatchConfig, WatcherStatus,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// A running worker and the channels controlling it.
struct WorkerHandle {
    cfg: WatchConfig,
    stats: Arc<ConfigStats>,
    pause_tx: watch::Sender<bool>,
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Registry of watch configurations. All operations are safe for concurrent
/// callers; no lock is held across an await.
pub struct WatcherRegistry<C: Clock, G: IdGen> {
    pipeline: Arc<JobPipeline<C>>,
    global: GlobalConfig,
    clock: C,
    id_gen: G,
    metrics: MetricsSink,
    workers: Mutex<HashMap<String, WorkerHandle>>,
    running: AtomicBool,
}

impl<C: Clock, G: IdGen> WatcherRegistry<C, G> {
    pub fn new(pipeline: Arc<JobPipeline<C>>, global: GlobalConfig, clock: C, id_gen: G) -> Self {
        let metrics = pipeline.metrics().clone();
        Self {
            pipeline,
            global,
            clock,
            id_gen,
            metrics,
            workers: Mutex::new(HashMap::new()),
            running: AtomicBool::new(true),
        }
    }

    /// Register a configuration and start its worker.
    ///
    /// Directories are created as needed; a pre-existing non-directory path
    /// rejects the registration. A disabled configuration is validated but
    /// no worker starts. Re-registering a name drains the prior worker
    /// before the replacement is installed.
    pub async fn register(&self, cfg: WatchConfig) -> Result<(), EngineError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }
        cfg.validate()?;
        let patterns =
            FilePatterns::compile(&cfg.file_patterns).map_err(|source| EngineError::Pattern {
                name: cfg.name.clone(),
                source,
            })?;
        if !self.pipeline.registry().has_type(&cfg.processor_type) {
            return Err(EngineError::UnknownProcessorType {
                name: cfg.name.clone(),
                processor_type: cfg.processor_type.clone(),
            });
        }
        if !cfg.enabled {
            tracing::info!(config = %cfg.name, "configuration disabled, not starting a worker");
            return Ok(());
        }
        for dir in [&cfg.watch_dir, &cfg.completed_dir(), &cfg.error_dir()] {
            ensure_directory(dir)?;
        }

        // Drain any prior worker under this name before installing.
        let prior = self.workers.lock().remove(&cfg.name);
        if let Some(prior) = prior {
            tracing::info!(config = %cfg.name, "replacing existing worker");
            drain_worker(prior, self.processing_budget()).await;
        }

        let stats = Arc::new(ConfigStats::new());
        let (pause_tx, pause_rx) = watch::channel(false);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let ctx = WorkerContext {
            cfg: cfg.clone(),
            patterns,
            stats: Arc::clone(&stats),
            pipeline: Arc::clone(&self.pipeline),
            metrics: self.metrics.clone(),
            clock: self.clock.clone(),
            id_gen: self.id_gen.clone(),
            pause_rx,
            shutdown_rx,
        };
        let join = tokio::spawn(run_worker(ctx));

        let mut workers = self.workers.lock();
        workers.insert(
            cfg.name.clone(),
            WorkerHandle {
                cfg,
                stats,
                pause_tx,
                shutdown_tx,
                join,
            },
        );
        self.metrics
            .set_gauge("active_configurations", &[], workers.len() as i64);
        Ok(())
    }

    /// Stop and drain the named worker. Idempotent.
    pub async fn unregister(&self, name: &str) {
        let handle = self.workers.lock().remove(name);
        if let Some(handle) = handle {
            drain_worker(handle, self.processing_budget()).await;
        }
        let count = self.workers.lock().len();
        self.metrics
            .set_gauge("active_configurations", &[], count as i64);
    }

    /// Pause the named worker: the in-flight job completes, the next scan
    /// does not start.
    pub fn pause(&self, name: &str) -> Result<(), EngineError> {
        self.set_paused(name, true)
    }

    /// Resume a paused worker.
    pub fn resume(&self, name: &str) -> Result<(), EngineError> {
        self.set_paused(name, false)
    }

    fn set_paused(&self, name: &str, paused: bool) -> Result<(), EngineError> {
        let workers = self.workers.lock();
        let handle = workers
            .get(name)
            .ok_or_else(|| EngineError::UnknownConfig(name.to_string()))?;
        let _ = handle.pause_tx.send(paused);
        Ok(())
    }

    /// Snapshot of worker states by configuration name.
    pub fn watch_status(&self) -> BTreeMap<String, WatcherStatus> {
        self.workers
            .lock()
            .iter()
            .map(|(name, handle)| {
                (
                    name.clone(),
                    handle.stats.status().unwrap_or(WatcherStatus::Idle),
                )
            })
            .collect()
    }

    /// Per-configuration statistics, sorted by name.
    pub fn statistics(&self) -> Vec<StatsSnapshot> {
        let mut snapshots: Vec<_> = self
            .workers
            .lock()
            .iter()
            .map(|(name, handle)| handle.stats.snapshot(name))
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn statistics_for(&self, name: &str) -> Option<StatsSnapshot> {
        self.workers
            .lock()
            .get(name)
            .map(|handle| handle.stats.snapshot(name))
    }

    /// Global aggregate across all configurations.
    pub fn statistics_global(&self) -> StatsSnapshot {
        StatsSnapshot::aggregate(&self.statistics())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn processing_budget(&self) -> Duration {
        Duration::from_millis(self.global.processing_budget_ms)
    }

    /// The shared job pipeline (breakers, degradation, processors).
    pub fn pipeline(&self) -> &Arc<JobPipeline<C>> {
        &self.pipeline
    }

    /// Composite health: UP iff the registry is running and every worker is
    /// RUNNING or PAUSED.
    pub fn health(&self) -> HealthReport {
        let mut entries = BTreeMap::new();
        let running = self.is_running();
        entries.insert(
            "registry".to_string(),
            if running {
                HealthEntry::up()
            } else {
                HealthEntry::down("shutting down")
            },
        );
        for (name, status) in self.watch_status() {
            let entry = match status {
                WatcherStatus::Running | WatcherStatus::Paused => {
                    HealthEntry::up().with_detail("status", status)
                }
                other => HealthEntry::down("worker not running").with_detail("status", other),
            };
            entries.insert(format!("watcher:{name}"), entry);
        }
        HealthReport::from_entries(entries)
    }

    /// Stop accepting registrations, then drain every worker.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handles: Vec<WorkerHandle> = {
            let mut workers = self.workers.lock();
            workers.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            drain_worker(handle, self.processing_budget()).await;
        }
        self.metrics.set_gauge("active_configurations", &[], 0);
        tracing::info!("watcher registry shut down");
    }
}

/// Signal shutdown and wait for the worker to finish its in-flight job,
/// bounded by the poll interval plus the processing budget; cancel after.
async fn drain_worker(handle: WorkerHandle, processing_budget: Duration) {
    let WorkerHandle {
        cfg,
        stats,
        shutdown_tx,
        mut join,
        ..
    } = handle;
    let _ = shutdown_tx.send(());
    let budget = Duration::from_millis(cfg.poll_interval_ms) + processing_budget;
    if tokio::time::timeout(budget, &mut join).await.is_err() {
        tracing::warn!(config = %cfg.name, "worker did not stop within budget, cancelling");
        join.abort();
    }
    stats.set_status(WatcherStatus::Stopped);
}

struct WorkerContext<C: Clock, G: IdGen> {
    cfg: WatchConfig,
    patterns: FilePatterns,
    stats: Arc<ConfigStats>,
    pipeline: Arc<JobPipeline<C>>,
    metrics: MetricsSink,
    clock: C,
    id_gen: G,
    pause_rx: watch::Receiver<bool>,
    shutdown_rx: oneshot::Receiver<()>,
}

/// The cooperative worker loop for one configuration.
async fn run_worker<C: Clock, G: IdGen>(mut ctx: WorkerContext<C, G>) {
    let poll = Duration::from_millis(ctx.cfg.poll_interval_ms);
    tracing::info!(config = %ctx.cfg.name, watch_dir = %ctx.cfg.watch_dir.display(), "worker started");
    ctx.stats.set_status(WatcherStatus::Running);

    'outer: loop {
        if *ctx.pause_rx.borrow() {
            ctx.stats.set_status(WatcherStatus::Paused);
            tokio::select! {
                _ = &mut ctx.shutdown_rx => break 'outer,
                changed = ctx.pause_rx.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                    continue;
                }
            }
        }
        ctx.stats.set_status(WatcherStatus::Running);
        let tick_start = ctx.clock.now();

        run_tick(&mut ctx).await;
        if shutdown_requested(&mut ctx.shutdown_rx) {
            break 'outer;
        }

        let elapsed = ctx.clock.now() - tick_start;
        let sleep_for = poll.saturating_sub(elapsed);
        tokio::select! {
            _ = &mut ctx.shutdown_rx => break 'outer,
            _ = tokio::time::sleep(sleep_for) => {}
            changed = ctx.pause_rx.changed() => {
                if changed.is_err() {
                    break 'outer;
                }
            }
        }
    }

    ctx.stats.set_status(WatcherStatus::Stopped);
    tracing::info!(config = %ctx.cfg.name, "worker stopped");
}

/// One scan-and-dispatch pass. Never lets an error escape: per-file errors
/// are absorbed by the pipeline, per-tick errors mark the worker ERROR and
/// the next tick retries.
async fn run_tick<C: Clock, G: IdGen>(ctx: &mut WorkerContext<C, G>) {
    let degradation = ctx.pipeline.degradation();
    degradation.sync_with_breakers(ctx.pipeline.breakers());
    if !degradation.global_degradation() {
        if let Err(e) = degradation.process_queued(&ctx.cfg) {
            tracing::warn!(config = %ctx.cfg.name, error = %e, "queue replay failed");
            ctx.stats.set_status(WatcherStatus::Error);
        }
    }

    let candidates = match scan_directory(&ctx.cfg.watch_dir, &ctx.patterns) {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!(
                config = %ctx.cfg.name,
                watch_dir = %ctx.cfg.watch_dir.display(),
                error = %e,
                "directory scan failed, skipping tick"
            );
            ctx.stats.set_status(WatcherStatus::Error);
            return;
        }
    };

    for candidate in candidates {
        if shutdown_requested(&mut ctx.shutdown_rx) || *ctx.pause_rx.borrow() {
            break;
        }
        ctx.metrics.incr("files.detected", &[]);
        let job = ProcessingJob {
            config_name: ctx.cfg.name.clone(),
            path: candidate.path,
            size: candidate.size,
            detected_at_ms: ctx.clock.epoch_ms(),
            correlation_id: CorrelationId::new(ctx.id_gen.next()),
        };
        let outcome = ctx.pipeline.run(&job, &ctx.cfg, &ctx.stats).await;
        if let JobOutcome::MoveFailed { .. } = outcome {
            // Terminal result without a committed move: stop the scan so the
            // file is not picked up twice within one tick.
            break;
        }
    }
}

fn shutdown_requested(rx: &mut oneshot::Receiver<()>) -> bool {
    !matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Empty))
}

struct Candidate {
    name: String,
    path: PathBuf,
    size: u64,
}

/// List immediate children, drop directories and in-use names, keep pattern
/// matches, and order them byte-wise by filename.
fn scan_directory(dir: &Path, patterns: &FilePatterns) -> std::io::Result<Vec<Candidate>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_in_use_name(&name) || !patterns.matches(&name) {
            continue;
        }
        let size = entry.metadata()?.len();
        candidates.push(Candidate {
            path: entry.path(),
            name,
            size,
        });
    }
    candidates.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    Ok(candidates)
}

fn ensure_directory(dir: &Path) -> Result<(), EngineError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(EngineError::NotADirectory(dir.to_path_buf()));
        }
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|source| EngineError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
