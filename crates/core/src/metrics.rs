// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process metrics: labeled counters, duration timers, gauges.
//!
//! Every component records here; the control surface reads snapshots. An
//! external exporter can drain the snapshot on its own cadence.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Metric identity: a name plus sorted label pairs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct MetricKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        let mut labels: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        labels.sort();
        Self {
            name: name.to_string(),
            labels,
        }
    }

    fn render(&self) -> String {
        if self.labels.is_empty() {
            return self.name.clone();
        }
        let labels: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{}{{{}}}", self.name, labels.join(","))
    }
}

#[derive(Debug, Default, Clone)]
struct TimerStats {
    count: u64,
    total_ms: u64,
    max_ms: u64,
}

#[derive(Default)]
struct MetricsState {
    counters: BTreeMap<MetricKey, u64>,
    timers: BTreeMap<MetricKey, TimerStats>,
    gauges: BTreeMap<MetricKey, i64>,
}

/// Shared metrics sink. Cheap to clone.
#[derive(Clone, Default)]
pub struct MetricsSink {
    state: Arc<Mutex<MetricsState>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a labeled counter by one.
    pub fn incr(&self, name: &str, labels: &[(&str, &str)]) {
        self.incr_by(name, labels, 1);
    }

    pub fn incr_by(&self, name: &str, labels: &[(&str, &str)], delta: u64) {
        let key = MetricKey::new(name, labels);
        *self.state.lock().counters.entry(key).or_insert(0) += delta;
    }

    /// Record one observation of a duration timer.
    pub fn record_duration(&self, name: &str, labels: &[(&str, &str)], duration: Duration) {
        let ms = duration.as_millis() as u64;
        let key = MetricKey::new(name, labels);
        let mut state = self.state.lock();
        let timer = state.timers.entry(key).or_default();
        timer.count += 1;
        timer.total_ms += ms;
        timer.max_ms = timer.max_ms.max(ms);
    }

    /// Set a gauge to an absolute value.
    pub fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: i64) {
        let key = MetricKey::new(name, labels);
        self.state.lock().gauges.insert(key, value);
    }

    /// Read a counter; zero when never incremented.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = MetricKey::new(name, labels);
        self.state.lock().counters.get(&key).copied().unwrap_or(0)
    }

    /// Sum of all counters with the given name, regardless of labels.
    pub fn counter_total(&self, name: &str) -> u64 {
        self.state
            .lock()
            .counters
            .iter()
            .filter(|(k, _)| k.name == name)
            .map(|(_, v)| *v)
            .sum()
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<i64> {
        let key = MetricKey::new(name, labels);
        self.state.lock().gauges.get(&key).copied()
    }

    /// Point-in-time view of everything recorded so far.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock();
        MetricsSnapshot {
            counters: state
                .counters
                .iter()
                .map(|(k, v)| (k.render(), *v))
                .collect(),
            timers: state
                .timers
                .iter()
                .map(|(k, t)| {
                    (
                        k.render(),
                        TimerSnapshot {
                            count: t.count,
                            total_ms: t.total_ms,
                            max_ms: t.max_ms,
                        },
                    )
                })
                .collect(),
            gauges: state.gauges.iter().map(|(k, v)| (k.render(), *v)).collect(),
        }
    }
}

/// Serializable timer aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub count: u64,
    pub total_ms: u64,
    pub max_ms: u64,
}

/// Serializable dump of the sink, keyed by rendered metric name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub timers: BTreeMap<String, TimerSnapshot>,
    pub gauges: BTreeMap<String, i64>,
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
