// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Central error handling: pattern aggregation, recovery strategy selection,
//! and alert gating.
//!
//! Identical errors (same context, error kind, message hash) aggregate into
//! one pattern whose occurrence count drives log-level laddering and the
//! circuit-break escalation.

use intake_core::{Clock, ErrorCategory, MetricsSink, ProcessError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Occurrence count above which a sustained error rate escalates to
/// CIRCUIT_BREAK.
const CIRCUIT_BREAK_COUNT: u64 = 10;
const CIRCUIT_BREAK_RATE_PER_MIN: f64 = 0.5;

/// Alert once a pattern is both frequent and sustained.
const ALERT_COUNT: u64 = 5;
const ALERT_RATE_PER_MIN: f64 = 0.3;

/// What the caller should do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryStrategy {
    FailFast,
    CircuitBreak,
    ExponentialBackoff,
    LinearBackoff,
    SimpleRetry,
}

/// Aggregated record of one recurring error shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub context: String,
    pub kind: String,
    pub message_hash: String,
    pub category: ErrorCategory,
    pub count: u64,
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
}

impl ErrorPattern {
    /// Occurrences per minute since the pattern was first seen.
    fn rate_per_min(&self) -> f64 {
        let span_ms = self.last_seen_ms.saturating_sub(self.first_seen_ms).max(1);
        self.count as f64 / (span_ms as f64 / 60_000.0)
    }
}

/// The handler's verdict for one error occurrence.
#[derive(Debug, Clone)]
pub struct ErrorAssessment {
    pub category: ErrorCategory,
    pub strategy: RecoveryStrategy,
    pub occurrence: u64,
    pub should_alert: bool,
    pub human_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PatternKey {
    context: String,
    kind: String,
    message_hash: String,
}

/// Aggregates errors and decides recovery strategy and alerting.
pub struct ErrorHandler<C: Clock> {
    clock: C,
    metrics: MetricsSink,
    patterns: Mutex<HashMap<PatternKey, ErrorPattern>>,
}

impl<C: Clock> ErrorHandler<C> {
    pub fn new(clock: C, metrics: MetricsSink) -> Self {
        Self {
            clock,
            metrics,
            patterns: Mutex::new(HashMap::new()),
        }
    }

    /// Record one error occurrence and return the assessment.
    pub fn handle(&self, context: &str, operation: &str, error: &ProcessError) -> ErrorAssessment {
        let category = error.category();
        let now_ms = self.clock.epoch_ms();
        let key = PatternKey {
            context: context.to_string(),
            kind: error.kind().to_string(),
            message_hash: hash_message(error.message()),
        };

        let (occurrence, rate, first) = {
            let mut patterns = self.patterns.lock();
            let pattern = patterns.entry(key.clone()).or_insert_with(|| ErrorPattern {
                context: key.context.clone(),
                kind: key.kind.clone(),
                message_hash: key.message_hash.clone(),
                category,
                count: 0,
                first_seen_ms: now_ms,
                last_seen_ms: now_ms,
            });
            pattern.count += 1;
            pattern.last_seen_ms = now_ms;
            (pattern.count, pattern.rate_per_min(), pattern.count == 1)
        };

        self.metrics.incr(
            "errors",
            &[("category", &category.to_string()), ("context", context)],
        );

        // Log level ladders down as a pattern repeats.
        if first {
            tracing::error!(context, operation, error = %error, category = %category, "processing error");
        } else if occurrence <= ALERT_COUNT {
            tracing::warn!(context, operation, error = %error, occurrence, "recurring processing error");
        } else {
            tracing::debug!(context, operation, error = %error, occurrence, "recurring processing error");
        }

        let strategy = select_strategy(category, occurrence, rate);
        let should_alert = should_alert(category, occurrence, rate);
        if should_alert {
            self.metrics
                .incr("errors.alerts", &[("category", &category.to_string())]);
            tracing::error!(
                context,
                operation,
                category = %category,
                occurrence,
                "alerting on error pattern"
            );
        }

        ErrorAssessment {
            category,
            strategy,
            occurrence,
            should_alert,
            human_message: human_message(category, error),
        }
    }

    /// Snapshot of all aggregated patterns.
    pub fn patterns(&self) -> Vec<ErrorPattern> {
        let mut patterns: Vec<_> = self.patterns.lock().values().cloned().collect();
        patterns.sort_by(|a, b| {
            (&a.context, &a.kind, &a.message_hash).cmp(&(&b.context, &b.kind, &b.message_hash))
        });
        patterns
    }
}

fn select_strategy(category: ErrorCategory, occurrence: u64, rate_per_min: f64) -> RecoveryStrategy {
    if !category.retryable() {
        return RecoveryStrategy::FailFast;
    }
    if occurrence > CIRCUIT_BREAK_COUNT && rate_per_min > CIRCUIT_BREAK_RATE_PER_MIN {
        return RecoveryStrategy::CircuitBreak;
    }
    match category {
        ErrorCategory::Database | ErrorCategory::Network => RecoveryStrategy::ExponentialBackoff,
        ErrorCategory::FileSystem => RecoveryStrategy::LinearBackoff,
        _ => RecoveryStrategy::SimpleRetry,
    }
}

fn should_alert(category: ErrorCategory, occurrence: u64, rate_per_min: f64) -> bool {
    let critical_first = occurrence == 1
        && matches!(category, ErrorCategory::Security | ErrorCategory::Resource);
    critical_first || (occurrence > ALERT_COUNT && rate_per_min > ALERT_RATE_PER_MIN)
}

fn human_message(category: ErrorCategory, error: &ProcessError) -> String {
    match category {
        ErrorCategory::Database => "Database operation failed; the statement batch was not applied".to_string(),
        ErrorCategory::Network => "A network dependency is unreachable".to_string(),
        ErrorCategory::FileSystem => "A file could not be read or moved".to_string(),
        ErrorCategory::Security => "A security check failed; manual review required".to_string(),
        ErrorCategory::Resource => "A system resource is exhausted".to_string(),
        ErrorCategory::ExternalSystem => "An external system rejected the request".to_string(),
        ErrorCategory::Application => format!("The input could not be processed: {}", error.message()),
        ErrorCategory::Unknown => format!("Unexpected error: {}", error.message()),
    }
}

/// Short stable hash of the message text, so equal messages share a pattern.
fn hash_message(message: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    let mut out = String::with_capacity(16);
    for b in &digest[..8] {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
#[path = "error_handler_tests.rs"]
mod tests;
