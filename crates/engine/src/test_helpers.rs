// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for engine tests.

use async_trait::async_trait;
use intake_adapters::FileProcessor;
use intake_core::{
    CorrelationId, ProcessError, ProcessingJob, ProcessingResult, WatchConfig,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Build a job for a path with fixed metadata.
pub fn job_for(path: impl Into<PathBuf>) -> ProcessingJob {
    let path = path.into();
    ProcessingJob {
        config_name: "test".to_string(),
        size: 0,
        detected_at_ms: 1_700_000_000_000,
        correlation_id: CorrelationId::new("corr-test"),
        path,
    }
}

type Script = Box<dyn FnMut(&ProcessingJob) -> Result<ProcessingResult, ProcessError> + Send>;

/// Processor with scripted behavior that records every file it sees.
pub struct StubProcessor {
    processor_type: String,
    script: Mutex<Script>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StubProcessor {
    pub fn new(
        processor_type: &str,
        script: impl FnMut(&ProcessingJob) -> Result<ProcessingResult, ProcessError> + Send + 'static,
    ) -> Self {
        Self {
            processor_type: processor_type.to_string(),
            script: Mutex::new(Box::new(script)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A processor that always succeeds.
    pub fn succeeding(processor_type: &str) -> Self {
        let pt = processor_type.to_string();
        Self::new(processor_type, move |job| {
            Ok(ProcessingResult::success(job.file_name(), pt.clone()))
        })
    }

    /// A processor that always raises the given error.
    pub fn erroring(
        processor_type: &str,
        make_error: impl Fn() -> ProcessError + Send + 'static,
    ) -> Self {
        Self::new(processor_type, move |_| Err(make_error()))
    }

    /// Shared handle to the filenames seen, in dispatch order.
    pub fn seen(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl FileProcessor for StubProcessor {
    fn processor_type(&self) -> &str {
        &self.processor_type
    }

    async fn process(
        &self,
        job: &ProcessingJob,
        _cfg: &WatchConfig,
    ) -> Result<ProcessingResult, ProcessError> {
        self.seen.lock().push(job.file_name());
        (self.script.lock())(job)
    }
}
