// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processing job and result values.

use crate::CorrelationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A single file observed by a worker, dispatched for processing.
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    /// Name of the configuration that detected the file.
    pub config_name: String,
    /// Absolute path of the file at detection time.
    pub path: PathBuf,
    /// Size observed at detection time, in bytes.
    pub size: u64,
    /// Wall-clock detection time (epoch milliseconds).
    pub detected_at_ms: u64,
    pub correlation_id: CorrelationId,
}

impl ProcessingJob {
    /// The file name component of the job's path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Terminal status of a processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Success,
    Failure,
    Skipped,
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStatus::Success => write!(f, "SUCCESS"),
            ProcessingStatus::Failure => write!(f, "FAILURE"),
            ProcessingStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Result of one processor invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub filename: String,
    pub processor_type: String,
    pub status: ProcessingStatus,
    pub error_message: Option<String>,
    pub execution_duration_ms: u64,
    /// Scalar metadata reported by the processor (statement counts, etc).
    pub metadata: BTreeMap<String, String>,
}

impl ProcessingResult {
    pub fn success(filename: impl Into<String>, processor_type: impl Into<String>) -> Self {
        Self::with_status(filename, processor_type, ProcessingStatus::Success)
    }

    pub fn failure(
        filename: impl Into<String>,
        processor_type: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::with_status(filename, processor_type, ProcessingStatus::Failure);
        result.error_message = Some(error.into());
        result
    }

    pub fn skipped(filename: impl Into<String>, processor_type: impl Into<String>) -> Self {
        Self::with_status(filename, processor_type, ProcessingStatus::Skipped)
    }

    fn with_status(
        filename: impl Into<String>,
        processor_type: impl Into<String>,
        status: ProcessingStatus,
    ) -> Self {
        Self {
            filename: filename.into(),
            processor_type: processor_type.into(),
            status,
            error_message: None,
            execution_duration_ms: 0,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.execution_duration_ms = ms;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
