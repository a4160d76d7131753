// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job orchestration: degradation check, breaker-gated and retried
//! dispatch, then the result-driven file move.
//!
//! The file move is the commit point. A job whose move fails leaves the
//! file in place for the next tick, so processors must be idempotent up to
//! the move.

use crate::breaker::{BreakerSet, CallFailure};
use crate::degradation::DegradationMonitor;
use crate::error_handler::ErrorHandler;
use crate::file_manager::FileManager;
use crate::registry::ProcessorRegistry;
use crate::retry::RetryRunner;
use intake_core::{
    Clock, ConfigStats, GlobalConfig, MetricsSink, ProcessError, ProcessingJob, ProcessingResult,
    ProcessingStatus, WatchConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Everything a pipeline needs, wired once at startup.
pub struct PipelineDeps<C: Clock> {
    pub registry: Arc<ProcessorRegistry>,
    pub file_manager: FileManager<C>,
    pub breakers: Arc<BreakerSet<C>>,
    pub degradation: Arc<DegradationMonitor<C>>,
    pub error_handler: Arc<ErrorHandler<C>>,
    pub metrics: MetricsSink,
    pub global: GlobalConfig,
    pub clock: C,
}

/// Terminal disposition of one job.
#[derive(Debug)]
pub enum JobOutcome {
    /// Processed (successfully or skipped) and moved to completedDir.
    Completed {
        result: ProcessingResult,
        moved_to: PathBuf,
    },
    /// Failed terminally and moved to errorDir.
    Failed { error: String, moved_to: PathBuf },
    /// Diverted to the degradation queue; not processed.
    Queued { queued_to: PathBuf },
    /// Left in place for the next tick (budget exceeded, enqueue failure).
    Abandoned { reason: String },
    /// A terminal result was reached but the move failed; the file stays.
    MoveFailed { error: String },
}

enum DispatchFailure {
    Rejected,
    Error(ProcessError),
}

/// Runs jobs through the resilience layers to a terminal file move.
pub struct JobPipeline<C: Clock> {
    registry: Arc<ProcessorRegistry>,
    file_manager: FileManager<C>,
    breakers: Arc<BreakerSet<C>>,
    degradation: Arc<DegradationMonitor<C>>,
    error_handler: Arc<ErrorHandler<C>>,
    retry: RetryRunner,
    metrics: MetricsSink,
    global: GlobalConfig,
    clock: C,
}

impl<C: Clock> JobPipeline<C> {
    pub fn new(deps: PipelineDeps<C>) -> Self {
        Self {
            registry: deps.registry,
            file_manager: deps.file_manager,
            breakers: deps.breakers,
            degradation: deps.degradation,
            error_handler: deps.error_handler,
            retry: RetryRunner::new(deps.metrics.clone()),
            metrics: deps.metrics,
            global: deps.global,
            clock: deps.clock,
        }
    }

    pub fn registry(&self) -> &Arc<ProcessorRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &MetricsSink {
        &self.metrics
    }

    pub fn degradation(&self) -> &Arc<DegradationMonitor<C>> {
        &self.degradation
    }

    pub fn breakers(&self) -> &Arc<BreakerSet<C>> {
        &self.breakers
    }

    /// Process one job to a terminal outcome. Never panics or propagates:
    /// every failure shape maps to an outcome the worker can log and count.
    pub async fn run(
        &self,
        job: &ProcessingJob,
        cfg: &WatchConfig,
        stats: &ConfigStats,
    ) -> JobOutcome {
        let span = tracing::info_span!(
            "job",
            correlation = %job.correlation_id,
            config = %cfg.name,
            file = %job.file_name()
        );
        self.run_inner(job, cfg, stats).instrument(span).await
    }

    async fn run_inner(
        &self,
        job: &ProcessingJob,
        cfg: &WatchConfig,
        stats: &ConfigStats,
    ) -> JobOutcome {
        // While the database sink is degraded, new work is captured into the
        // queue instead of being attempted.
        if self.degradation.global_degradation() {
            return self.divert_to_queue(job, cfg);
        }

        let started = self.clock.now();
        let budget = Duration::from_millis(self.global.processing_budget_ms);
        let dispatched = tokio::time::timeout(budget, self.dispatch_guarded(job, cfg)).await;
        let elapsed = self.clock.now() - started;
        self.metrics
            .record_duration("processing.duration", &[], elapsed);

        match dispatched {
            Err(_elapsed) => {
                tracing::warn!(
                    budget_ms = self.global.processing_budget_ms,
                    "processing budget exceeded, abandoning job until next tick"
                );
                JobOutcome::Abandoned {
                    reason: "processing budget exceeded".to_string(),
                }
            }
            Ok(Ok(result)) => self.finish(job, cfg, stats, result),
            Ok(Err(DispatchFailure::Rejected)) => self.divert_to_queue(job, cfg),
            Ok(Err(DispatchFailure::Error(error))) => {
                let assessment = self.error_handler.handle(&cfg.name, "process", &error);
                tracing::warn!(
                    error = %error,
                    strategy = ?assessment.strategy,
                    "job failed terminally"
                );
                let result = ProcessingResult::failure(
                    job.file_name(),
                    cfg.processor_type.clone(),
                    error.message(),
                )
                .with_duration_ms(elapsed.as_millis() as u64);
                self.finish(job, cfg, stats, result)
            }
        }
    }

    /// The breaker-gated, retry-wrapped processor dispatch.
    async fn dispatch_guarded(
        &self,
        job: &ProcessingJob,
        cfg: &WatchConfig,
    ) -> Result<ProcessingResult, DispatchFailure> {
        self.breakers
            .database
            .execute(
                || async {
                    self.retry
                        .run_classified(&self.global, |_attempt| self.registry.dispatch(job, cfg))
                        .await
                        .map(Ok)
                },
                |cause| async move {
                    Err(match cause {
                        CallFailure::Rejected => DispatchFailure::Rejected,
                        CallFailure::Failed(error) => DispatchFailure::Error(error),
                    })
                },
            )
            .await
    }

    /// Move the file per the result and record statistics. Statistics are
    /// recorded only when the move commits, so a file retried on the next
    /// tick is not double-counted.
    fn finish(
        &self,
        job: &ProcessingJob,
        cfg: &WatchConfig,
        stats: &ConfigStats,
        result: ProcessingResult,
    ) -> JobOutcome {
        let moved = match result.status {
            ProcessingStatus::Success | ProcessingStatus::Skipped => {
                self.file_manager.move_to_completed(&job.path, cfg)
            }
            ProcessingStatus::Failure => {
                let details = result.error_message.as_deref().unwrap_or("unknown error");
                self.file_manager.move_to_error(&job.path, details, cfg)
            }
        };

        match moved {
            Ok(moved_to) => {
                stats.record(result.status, self.clock.epoch_ms());
                self.metrics.incr(
                    "files.processed",
                    &[("status", &result.status.to_string())],
                );
                match result.status {
                    ProcessingStatus::Failure => JobOutcome::Failed {
                        error: result
                            .error_message
                            .clone()
                            .unwrap_or_else(|| "unknown error".to_string()),
                        moved_to,
                    },
                    _ => {
                        tracing::info!(
                            status = %result.status,
                            moved_to = %moved_to.display(),
                            duration_ms = result.execution_duration_ms,
                            "job finished"
                        );
                        JobOutcome::Completed { result, moved_to }
                    }
                }
            }
            Err(move_err) => {
                self.error_handler
                    .handle(&cfg.name, "move", &move_err);
                tracing::error!(
                    error = %move_err,
                    "terminal result reached but the file move failed; leaving file in place"
                );
                JobOutcome::MoveFailed {
                    error: move_err.to_string(),
                }
            }
        }
    }

    fn divert_to_queue(&self, job: &ProcessingJob, cfg: &WatchConfig) -> JobOutcome {
        match self.degradation.queue_file(&job.path, cfg) {
            Ok(queued_to) => JobOutcome::Queued { queued_to },
            Err(error) => {
                tracing::warn!(error = %error, "failed to enqueue file during degradation");
                JobOutcome::Abandoned {
                    reason: format!("enqueue failed: {error}"),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
