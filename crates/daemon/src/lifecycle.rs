// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup wiring, single-instance lock, shutdown.

use crate::config_file::{ConfigFileError, DaemonConfig, DaemonSection};
use crate::control::ControlHandle;
use fs2::FileExt;
use intake_adapters::{LoaderLogProcessor, SqlExecutor, SqlScriptProcessor};
use intake_core::{MetricsSink, SystemClock, UuidIdGen};
use intake_engine::{
    BreakerSet, DegradationMonitor, EngineError, ErrorHandler, FileManager, JobPipeline,
    PipelineDeps, ProcessorRegistry, WatcherRegistry,
};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Registry with the daemon's concrete clock and id generator.
pub type DaemonRegistry = WatcherRegistry<SystemClock, UuidIdGen>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigFileError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("another instance holds the lock at {0}")]
    LockHeld(PathBuf),
    #[error("failed to prepare state dir {path}: {source}")]
    StateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("processor initialization failed: {0}")]
    ProcessorInit(String),
}

/// A started daemon. Dropping it releases the instance lock.
pub struct Daemon {
    registry: Arc<DaemonRegistry>,
    config: DaemonConfig,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Daemon {
    pub fn registry(&self) -> &Arc<DaemonRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// The handle the external control surface consumes.
    pub fn control(&self) -> ControlHandle<SystemClock, UuidIdGen> {
        ControlHandle::new(Arc::clone(&self.registry))
    }

    /// Graceful shutdown: stop registrations, drain every worker.
    pub async fn shutdown(&self) {
        info!("shutdown requested");
        self.registry.shutdown().await;
    }
}

/// Build the root object graph and start a worker for every enabled watch.
///
/// Startup is all-or-nothing: a misconfigured watch aborts the daemon with
/// the offending entry named, rather than running a partial set.
pub async fn startup<E: SqlExecutor>(
    config: DaemonConfig,
    executor: Arc<E>,
) -> Result<Daemon, LifecycleError> {
    let lock_file = acquire_lock(&config.daemon)?;

    info!(executor = %executor.info(), "starting intake daemon");
    if executor.test_connection().await {
        info!("database sink reachable");
    } else {
        warn!("database sink unreachable at startup; files will queue until it recovers");
    }

    let clock = SystemClock;
    let metrics = MetricsSink::new();

    let mut processors = ProcessorRegistry::new();
    processors.register(Arc::new(
        SqlScriptProcessor::new(Arc::clone(&executor))
            .map_err(|e| LifecycleError::ProcessorInit(e.to_string()))?,
    ));
    processors.register(Arc::new(
        LoaderLogProcessor::new(executor)
            .map_err(|e| LifecycleError::ProcessorInit(e.to_string()))?,
    ));

    let pipeline = Arc::new(JobPipeline::new(PipelineDeps {
        registry: Arc::new(processors),
        file_manager: FileManager::new(clock.clone(), metrics.clone()),
        breakers: Arc::new(BreakerSet::new(clock.clone(), metrics.clone())),
        degradation: Arc::new(DegradationMonitor::new(clock.clone(), metrics.clone())),
        error_handler: Arc::new(ErrorHandler::new(clock.clone(), metrics.clone())),
        metrics: metrics.clone(),
        global: config.global.clone(),
        clock: clock.clone(),
    }));

    let registry = Arc::new(WatcherRegistry::new(
        pipeline,
        config.global.clone(),
        clock,
        UuidIdGen,
    ));

    for watch in &config.watches {
        info!(config = %watch.name, watch_dir = %watch.watch_dir.display(), "registering watch");
        registry.register(watch.clone()).await?;
    }

    Ok(Daemon {
        registry,
        config,
        lock_file,
    })
}

/// Take the exclusive pid-file lock for this state directory.
fn acquire_lock(section: &DaemonSection) -> Result<File, LifecycleError> {
    std::fs::create_dir_all(&section.state_dir).map_err(|source| LifecycleError::StateDir {
        path: section.state_dir.clone(),
        source,
    })?;
    let lock_path = section.lock_path();
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|source| LifecycleError::StateDir {
            path: lock_path.clone(),
            source,
        })?;
    if file.try_lock_exclusive().is_err() {
        return Err(LifecycleError::LockHeld(lock_path));
    }
    let _ = file.set_len(0);
    let _ = writeln!(file, "{}", std::process::id());
    Ok(file)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
