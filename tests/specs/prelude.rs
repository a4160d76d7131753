// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixture for behavioral specs: the full engine stack with real
//! processors over a fake SQL executor.

use intake_adapters::{FakeSqlExecutor, LoaderLogProcessor, SqlScriptProcessor};
use intake_core::{
    FakeClock, GlobalConfig, MetricsSink, SequentialIdGen, WatchConfig,
};
use intake_engine::{
    BreakerSet, DegradationMonitor, ErrorHandler, FileManager, JobPipeline, PipelineDeps,
    ProcessorRegistry, WatcherRegistry,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Harness {
    pub registry: WatcherRegistry<FakeClock, SequentialIdGen>,
    pub executor: Arc<FakeSqlExecutor>,
    pub metrics: MetricsSink,
    pub root: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        fs::create_dir_all(root.path().join("watch")).expect("watch dir");

        let clock = FakeClock::new();
        let metrics = MetricsSink::new();
        let executor = Arc::new(FakeSqlExecutor::new());

        let mut processors = ProcessorRegistry::new();
        processors.register(Arc::new(
            SqlScriptProcessor::new(Arc::clone(&executor)).expect("script processor"),
        ));
        processors.register(Arc::new(
            LoaderLogProcessor::new(Arc::clone(&executor)).expect("loader processor"),
        ));

        let pipeline = Arc::new(JobPipeline::new(PipelineDeps {
            registry: Arc::new(processors),
            file_manager: FileManager::new(clock.clone(), metrics.clone()),
            breakers: Arc::new(BreakerSet::new(clock.clone(), metrics.clone())),
            degradation: Arc::new(DegradationMonitor::new(clock.clone(), metrics.clone())),
            error_handler: Arc::new(ErrorHandler::new(clock.clone(), metrics.clone())),
            metrics: metrics.clone(),
            global: GlobalConfig::default(),
            clock: clock.clone(),
        }));

        let registry = WatcherRegistry::new(
            pipeline,
            GlobalConfig::default(),
            clock,
            SequentialIdGen::new("corr"),
        );

        Self {
            registry,
            executor,
            metrics,
            root,
        }
    }

    pub fn watch_dir(&self) -> PathBuf {
        self.root.path().join("watch")
    }

    pub fn queue_dir(&self) -> PathBuf {
        self.root.path().join("queue")
    }

    pub fn sql_config(&self) -> WatchConfig {
        let mut cfg = WatchConfig::for_tests("sql-inbox", self.watch_dir());
        cfg.processor_type = "sql-script".to_string();
        cfg.file_patterns = vec!["*.sql".to_string()];
        cfg
    }

    pub fn loader_config(&self) -> WatchConfig {
        let mut cfg = WatchConfig::for_tests("loader-logs", self.watch_dir());
        cfg.processor_type = "sqlloader-log".to_string();
        cfg.file_patterns = vec!["*.log".to_string()];
        cfg
    }

    pub fn drop_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.watch_dir().join(name);
        fs::write(&path, content).expect("write file");
        path
    }

    pub fn completed_names(&self, cfg: &WatchConfig) -> Vec<String> {
        Self::names_in(&cfg.completed_dir())
    }

    pub fn error_names(&self, cfg: &WatchConfig) -> Vec<String> {
        Self::names_in(&cfg.error_dir())
    }

    pub fn queue_names(&self) -> Vec<String> {
        Self::names_in(&self.queue_dir())
    }

    pub fn watch_names(&self) -> Vec<String> {
        Self::names_in(&self.watch_dir())
            .into_iter()
            .filter(|n| n != "completed" && n != "error")
            .collect()
    }

    fn names_in(dir: &std::path::Path) -> Vec<String> {
        match fs::read_dir(dir) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }
}

/// Wait for a condition under paused tokio time.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not reached in time");
}
