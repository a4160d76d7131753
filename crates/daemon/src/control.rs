// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control surface consumed by the external HTTP/monitoring layer.
//!
//! Everything returned here is a serde DTO; the HTTP layer can serialize
//! responses without reaching into engine internals.

use intake_core::{
    Clock, HealthReport, IdGen, MetricsSnapshot, StatsSnapshot, WatchConfig, WatcherStatus,
};
use intake_engine::{DegradationState, EngineError, WatcherRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Point-in-time daemon status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub running: bool,
    pub watchers: BTreeMap<String, WatcherStatus>,
}

/// Global plus per-configuration statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub global: StatsSnapshot,
    pub configurations: Vec<StatsSnapshot>,
}

/// Handle over the watcher registry for external callers.
pub struct ControlHandle<C: Clock, G: IdGen> {
    registry: Arc<WatcherRegistry<C, G>>,
}

impl<C: Clock, G: IdGen> ControlHandle<C, G> {
    pub fn new(registry: Arc<WatcherRegistry<C, G>>) -> Self {
        Self { registry }
    }

    pub fn is_running(&self) -> bool {
        self.registry.is_running()
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            running: self.registry.is_running(),
            watchers: self.registry.watch_status(),
        }
    }

    pub fn statistics(&self) -> StatisticsReport {
        StatisticsReport {
            global: self.registry.statistics_global(),
            configurations: self.registry.statistics(),
        }
    }

    pub fn statistics_for(&self, name: &str) -> Option<StatsSnapshot> {
        self.registry.statistics_for(name)
    }

    pub fn health(&self) -> HealthReport {
        self.registry.health()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.registry.pipeline().metrics().snapshot()
    }

    pub fn degradation(&self) -> Vec<DegradationState> {
        self.registry.pipeline().degradation().states()
    }

    pub async fn register(&self, cfg: WatchConfig) -> Result<(), EngineError> {
        self.registry.register(cfg).await
    }

    pub async fn unregister(&self, name: &str) {
        self.registry.unregister(name).await;
    }

    pub fn pause(&self, name: &str) -> Result<(), EngineError> {
        self.registry.pause(name)
    }

    pub fn resume(&self, name: &str) -> Result<(), EngineError> {
        self.registry.resume(name)
    }

    /// Emergency breaker control: `database`, `filesystem`, or `external`.
    pub fn force_breaker(&self, name: &str, open: bool) -> Result<(), EngineError> {
        let breakers = self.registry.pipeline().breakers();
        let breaker = match name {
            "database" => &breakers.database,
            "filesystem" => &breakers.filesystem,
            "external" => &breakers.external,
            _ => return Err(EngineError::UnknownConfig(name.to_string())),
        };
        if open {
            breaker.force_open();
        } else {
            breaker.force_close();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
