// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The processor contract: one unit that consumes a file and produces a
//! result.

use async_trait::async_trait;
use intake_core::{ProcessError, ProcessingJob, ProcessingResult, WatchConfig};

/// A file processor keyed by its `processor_type`.
///
/// Processors return failures as `ProcessingResult` with FAILURE status when
/// the file itself is bad, and raise `ProcessError` for environmental
/// failures (sink down, file unreadable) that the resilience layer should
/// retry or queue.
#[async_trait]
pub trait FileProcessor: Send + Sync {
    /// The dispatch key configurations select this processor by.
    fn processor_type(&self) -> &str;

    /// Whether this processor handles the given configuration.
    fn supports(&self, cfg: &WatchConfig) -> bool {
        cfg.processor_type == self.processor_type()
    }

    /// Process one file. Must be idempotent up to the file move: the caller
    /// may invoke it again if the file was never moved.
    async fn process(
        &self,
        job: &ProcessingJob,
        cfg: &WatchConfig,
    ) -> Result<ProcessingResult, ProcessError>;
}
