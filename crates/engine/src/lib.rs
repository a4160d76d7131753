// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! intake-engine: the file-processing engine.
//!
//! One worker task per registered configuration scans its watch directory
//! and drives matching files through the pipeline: processor dispatch gated
//! by circuit breakers and retry policies, terminal file moves, and a
//! degradation queue when the database sink is down.

mod breaker;
mod degradation;
mod error;
mod error_handler;
mod file_manager;
mod pipeline;
mod registry;
mod retry;
mod watcher;

#[cfg(test)]
mod test_helpers;

pub use breaker::{BreakerConfig, BreakerSet, BreakerState, CallFailure, CircuitBreaker};
pub use degradation::{DegradationMonitor, DegradationState, RestoreSummary};
pub use error::EngineError;
pub use error_handler::{ErrorAssessment, ErrorHandler, ErrorPattern, RecoveryStrategy};
pub use file_manager::FileManager;
pub use pipeline::{JobOutcome, JobPipeline, PipelineDeps};
pub use registry::ProcessorRegistry;
pub use retry::{Backoff, RetryPolicy, RetryRunner};
pub use watcher::WatcherRegistry;
