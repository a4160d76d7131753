// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Category-indexed retry policies with backoff variants.
//!
//! Four named policies cover the failure domains; the global configuration
//! can override the attempt cap and base delay. After the final attempt the
//! original error is surfaced to the caller.

use intake_core::{ErrorCategory, GlobalConfig, MetricsSink, ProcessError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Delay schedule between attempts. `attempt` is 1-based: the delay after
/// the first failed attempt is `delay(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same interval every time.
    Fixed(Duration),
    /// `base * attempt`.
    Linear(Duration),
    /// `base * 2^(attempt-1)`.
    Exponential(Duration),
    /// Exponential plus a uniform random jitter in `[0, jitter)`.
    ExponentialJitter { base: Duration, jitter: Duration },
}

impl Backoff {
    /// The delay before retry number `attempt` (1-based). The jitter variant
    /// draws from the thread-local RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self {
            Backoff::Fixed(d) => *d,
            Backoff::Linear(base) => *base * attempt,
            Backoff::Exponential(base) => *base * 2u32.saturating_pow(attempt - 1),
            Backoff::ExponentialJitter { base, jitter } => {
                let exp = *base * 2u32.saturating_pow(attempt - 1);
                let extra_ms = if jitter.as_millis() == 0 {
                    0
                } else {
                    rand::rng().random_range(0..jitter.as_millis() as u64)
                };
                exp + Duration::from_millis(extra_ms)
            }
        }
    }
}

/// A named retry policy: attempt cap, backoff, and the predicate deciding
/// which errors are worth another try.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub name: &'static str,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Transient database failures: 3 attempts, 1s/2s/4s.
    pub fn database() -> Self {
        Self {
            name: "database",
            max_attempts: 3,
            backoff: Backoff::Exponential(Duration::from_secs(1)),
        }
    }

    /// File system hiccups: 5 attempts, 500ms linear.
    pub fn filesystem() -> Self {
        Self {
            name: "filesystem",
            max_attempts: 5,
            backoff: Backoff::Linear(Duration::from_millis(500)),
        }
    }

    /// Network failures: 4 attempts, exponential from 2s with up to 1s jitter.
    pub fn network() -> Self {
        Self {
            name: "network",
            max_attempts: 4,
            backoff: Backoff::ExponentialJitter {
                base: Duration::from_secs(2),
                jitter: Duration::from_secs(1),
            },
        }
    }

    /// Catch-all: 2 attempts, fixed 1s.
    pub fn simple() -> Self {
        Self {
            name: "simple",
            max_attempts: 2,
            backoff: Backoff::Fixed(Duration::from_secs(1)),
        }
    }

    /// The policy for an error category.
    pub fn for_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Database => Self::database(),
            ErrorCategory::FileSystem => Self::filesystem(),
            ErrorCategory::Network | ErrorCategory::ExternalSystem => Self::network(),
            _ => Self::simple(),
        }
    }

    /// Apply the global overrides when configured: `max_retry_attempts`
    /// replaces the attempt cap, `retry_delay_ms` replaces the base delay of
    /// whatever backoff shape the policy uses. Unset fields leave the named
    /// policies with their documented schedules.
    pub fn with_global(mut self, global: &GlobalConfig) -> Self {
        if let Some(cap) = global.max_retry_attempts {
            self.max_attempts = cap.max(1);
        }
        if let Some(ms) = global.retry_delay_ms {
            let base = Duration::from_millis(ms);
            self.backoff = match self.backoff {
                Backoff::Fixed(_) => Backoff::Fixed(base),
                Backoff::Linear(_) => Backoff::Linear(base),
                Backoff::Exponential(_) => Backoff::Exponential(base),
                Backoff::ExponentialJitter { jitter, .. } => {
                    Backoff::ExponentialJitter { base, jitter }
                }
            };
        }
        self
    }

    /// Whether the policy considers this error transient.
    pub fn retryable(&self, error: &ProcessError) -> bool {
        let category = error.category();
        let message = error.message().to_lowercase();
        let has = |ps: &[&str]| ps.iter().any(|p| message.contains(p));
        match self.name {
            "database" => {
                matches!(category, ErrorCategory::Database | ErrorCategory::Network)
                    || has(&["timeout", "database", "connection failed", "temporary failure"])
            }
            "filesystem" => {
                category == ErrorCategory::FileSystem
                    || has(&["file", "directory", "permission", "access denied"])
            }
            "network" => {
                matches!(category, ErrorCategory::Network | ErrorCategory::ExternalSystem)
                    || has(&["timeout", "connection", "network"])
            }
            _ => true,
        }
    }
}

/// Runs operations under a retry policy, emitting attempt/outcome metrics.
#[derive(Clone)]
pub struct RetryRunner {
    metrics: MetricsSink,
}

impl RetryRunner {
    pub fn new(metrics: MetricsSink) -> Self {
        Self { metrics }
    }

    /// Run `op` under the given policy. Retries transient failures until the
    /// attempt cap; the last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, policy: &RetryPolicy, mut op: F) -> Result<T, ProcessError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProcessError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    self.metrics.incr("retry.success", &[("name", policy.name)]);
                    return Ok(value);
                }
                Err(error) => {
                    if !policy.retryable(&error) || attempt >= policy.max_attempts {
                        self.metrics.incr("retry.failure", &[("name", policy.name)]);
                        return Err(error);
                    }
                    let delay = policy.backoff.delay(attempt);
                    tracing::debug!(
                        policy = policy.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying after transient failure"
                    );
                    self.metrics.incr("retry.attempts", &[("name", policy.name)]);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run `op`, choosing the policy from the category of the first error.
    pub async fn run_classified<T, F, Fut>(
        &self,
        global: &GlobalConfig,
        mut op: F,
    ) -> Result<T, ProcessError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProcessError>>,
    {
        let first = match op(1).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        let category = first.category();
        let policy = RetryPolicy::for_category(category).with_global(global);
        // Non-retryable categories fail fast regardless of the policy's own
        // predicate (the catch-all policy would otherwise retry anything).
        if !category.retryable() || !policy.retryable(&first) || policy.max_attempts <= 1 {
            self.metrics.incr("retry.failure", &[("name", policy.name)]);
            return Err(first);
        }
        self.metrics.incr("retry.attempts", &[("name", policy.name)]);
        tokio::time::sleep(policy.backoff.delay(1)).await;

        let mut attempt = 2;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    self.metrics.incr("retry.success", &[("name", policy.name)]);
                    return Ok(value);
                }
                Err(error) => {
                    if !policy.retryable(&error) || attempt >= policy.max_attempts {
                        self.metrics.incr("retry.failure", &[("name", policy.name)]);
                        return Err(error);
                    }
                    self.metrics.incr("retry.attempts", &[("name", policy.name)]);
                    tokio::time::sleep(policy.backoff.delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
