// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sliding-window circuit breakers gating the external dependencies.
//!
//! A breaker counts outcomes over the last N calls. Once the window holds at
//! least the minimum number of calls and the failure rate crosses the
//! threshold, it opens: suppliers are not invoked and fallbacks run
//! immediately. After the open wait it half-opens and admits a bounded
//! number of trial calls; a clean trial run closes it, any trial failure
//! reopens it.

use intake_core::{Clock, MetricsSink, ProcessError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "CLOSED"),
            BreakerState::Open => write!(f, "OPEN"),
            BreakerState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Why the fallback ran.
#[derive(Debug)]
pub enum CallFailure {
    /// The breaker was open; the supplier was never invoked.
    Rejected,
    /// The supplier ran and failed.
    Failed(ProcessError),
}

/// Slow-call detection: calls slower than `threshold` count against
/// `rate_threshold` the same way failures count against the failure rate.
#[derive(Debug, Clone, Copy)]
pub struct SlowCallPolicy {
    pub threshold: Duration,
    pub rate_threshold: f64,
}

/// Tuning for one breaker.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub name: &'static str,
    pub failure_rate_threshold: f64,
    pub window_size: usize,
    pub min_calls: usize,
    pub open_wait: Duration,
    pub half_open_max_calls: usize,
    pub slow_call: Option<SlowCallPolicy>,
}

impl BreakerConfig {
    pub fn database() -> Self {
        Self {
            name: "database",
            failure_rate_threshold: 0.5,
            window_size: 10,
            min_calls: 5,
            open_wait: Duration::from_secs(30),
            half_open_max_calls: 3,
            slow_call: Some(SlowCallPolicy {
                threshold: Duration::from_secs(5),
                rate_threshold: 0.8,
            }),
        }
    }

    pub fn filesystem() -> Self {
        Self {
            name: "filesystem",
            failure_rate_threshold: 0.7,
            window_size: 20,
            min_calls: 10,
            open_wait: Duration::from_secs(15),
            half_open_max_calls: 5,
            slow_call: None,
        }
    }

    pub fn external() -> Self {
        Self {
            name: "external",
            failure_rate_threshold: 0.6,
            window_size: 15,
            min_calls: 8,
            open_wait: Duration::from_secs(20),
            half_open_max_calls: 4,
            slow_call: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Outcome {
    failed: bool,
    slow: bool,
}

struct Inner {
    state: BreakerState,
    window: VecDeque<Outcome>,
    opened_at: Option<Instant>,
    half_open_admitted: usize,
    half_open_completed: usize,
}

/// One circuit breaker. Cheap to share via `Arc`.
pub struct CircuitBreaker<C: Clock> {
    config: BreakerConfig,
    clock: C,
    metrics: MetricsSink,
    inner: Mutex<Inner>,
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(config: BreakerConfig, clock: C, metrics: MetricsSink) -> Self {
        Self {
            config,
            clock,
            metrics,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: VecDeque::new(),
                opened_at: None,
                half_open_admitted: 0,
                half_open_completed: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.config.name
    }

    /// Current state, applying the open → half-open transition if the open
    /// wait has elapsed.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        inner.state
    }

    /// Run `supplier` under the breaker. When the call is rejected or fails,
    /// `fallback` runs exactly once with the cause.
    pub async fn execute<T, SFut, FFut>(
        &self,
        supplier: impl FnOnce() -> SFut,
        fallback: impl FnOnce(CallFailure) -> FFut,
    ) -> T
    where
        SFut: Future<Output = Result<T, ProcessError>>,
        FFut: Future<Output = T>,
    {
        if !self.try_acquire() {
            self.metrics
                .incr("breaker.rejection", &[("name", self.config.name)]);
            return fallback(CallFailure::Rejected).await;
        }
        let start = self.clock.now();
        match supplier().await {
            Ok(value) => {
                self.record(false, self.clock.now() - start);
                value
            }
            Err(error) => {
                self.record(true, self.clock.now() - start);
                fallback(CallFailure::Failed(error)).await
            }
        }
    }

    /// Force the breaker open (emergency control). It half-opens again after
    /// the configured wait, like an organically opened breaker.
    pub fn force_open(&self) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, BreakerState::Open);
    }

    /// Force the breaker closed, discarding the recorded window.
    pub fn force_close(&self) {
        let mut inner = self.inner.lock();
        inner.window.clear();
        self.transition(&mut inner, BreakerState::Closed);
    }

    fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        self.maybe_half_open(&mut inner);
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => {
                if inner.half_open_admitted < self.config.half_open_max_calls {
                    inner.half_open_admitted += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record(&self, failed: bool, duration: Duration) {
        let slow = self
            .config
            .slow_call
            .is_some_and(|p| duration > p.threshold);
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => {
                inner.window.push_back(Outcome { failed, slow });
                while inner.window.len() > self.config.window_size {
                    inner.window.pop_front();
                }
                if self.should_open(&inner) {
                    self.transition(&mut inner, BreakerState::Open);
                }
            }
            BreakerState::HalfOpen => {
                inner.half_open_completed += 1;
                if failed {
                    self.transition(&mut inner, BreakerState::Open);
                } else if inner.half_open_completed >= self.config.half_open_max_calls {
                    inner.window.clear();
                    self.transition(&mut inner, BreakerState::Closed);
                }
            }
            // A late completion after a forced transition; nothing to count.
            BreakerState::Open => {}
        }
    }

    fn should_open(&self, inner: &Inner) -> bool {
        let total = inner.window.len();
        if total < self.config.min_calls {
            return false;
        }
        let failures = inner.window.iter().filter(|o| o.failed).count();
        if failures as f64 / total as f64 >= self.config.failure_rate_threshold {
            return true;
        }
        if let Some(policy) = self.config.slow_call {
            let slow = inner.window.iter().filter(|o| o.slow).count();
            if slow as f64 / total as f64 >= policy.rate_threshold {
                return true;
            }
        }
        false
    }

    fn maybe_half_open(&self, inner: &mut Inner) {
        if inner.state == BreakerState::Open {
            let elapsed = inner.opened_at.map(|at| self.clock.now() - at);
            if elapsed.is_some_and(|e| e >= self.config.open_wait) {
                self.transition(inner, BreakerState::HalfOpen);
            }
        }
    }

    fn transition(&self, inner: &mut Inner, to: BreakerState) {
        if inner.state == to {
            return;
        }
        inner.state = to;
        inner.opened_at = (to == BreakerState::Open).then(|| self.clock.now());
        inner.half_open_admitted = 0;
        inner.half_open_completed = 0;
        tracing::info!(breaker = self.config.name, state = %to, "breaker state change");
        self.metrics.incr(
            "breaker.state_change",
            &[("name", self.config.name), ("to", &to.to_string())],
        );
    }
}

/// The three breakers the pipeline consults.
pub struct BreakerSet<C: Clock> {
    pub database: Arc<CircuitBreaker<C>>,
    pub filesystem: Arc<CircuitBreaker<C>>,
    pub external: Arc<CircuitBreaker<C>>,
}

impl<C: Clock> BreakerSet<C> {
    pub fn new(clock: C, metrics: MetricsSink) -> Self {
        Self {
            database: Arc::new(CircuitBreaker::new(
                BreakerConfig::database(),
                clock.clone(),
                metrics.clone(),
            )),
            filesystem: Arc::new(CircuitBreaker::new(
                BreakerConfig::filesystem(),
                clock.clone(),
                metrics.clone(),
            )),
            external: Arc::new(CircuitBreaker::new(
                BreakerConfig::external(),
                clock,
                metrics,
            )),
        }
    }

    /// Current state of every breaker, for degradation polling and status.
    pub fn states(&self) -> Vec<(&'static str, BreakerState)> {
        vec![
            ("database", self.database.state()),
            ("filesystem", self.filesystem.state()),
            ("external", self.external.state()),
        ]
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
