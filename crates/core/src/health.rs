// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health DTOs consumed by the external control surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Binary subsystem health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// One subsystem's health with free-form details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEntry {
    pub status: HealthStatus,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl HealthEntry {
    pub fn up() -> Self {
        Self {
            status: HealthStatus::Up,
            details: BTreeMap::new(),
        }
    }

    pub fn down(reason: impl Into<String>) -> Self {
        let mut details = BTreeMap::new();
        details.insert("reason".to_string(), reason.into());
        Self {
            status: HealthStatus::Down,
            details,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }
}

/// Composite health report: UP iff every entry is UP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub entries: BTreeMap<String, HealthEntry>,
}

impl HealthReport {
    pub fn from_entries(entries: BTreeMap<String, HealthEntry>) -> Self {
        let status = if entries.values().all(|e| e.status == HealthStatus::Up) {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        };
        Self { status, entries }
    }
}
