// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder executor for deployments without a configured sink.
//!
//! The standalone binary has no database driver; embedders supply a real
//! [`SqlExecutor`] through [`crate::lifecycle::startup`]. With this executor
//! every batch fails as a connection error, so the database breaker opens
//! and incoming files accumulate in the degradation queue instead of being
//! lost.

use async_trait::async_trait;
use intake_adapters::{SqlExecutor, SqlExecutorError, SqlOutcome};

/// Executor used when no database sink is configured.
#[derive(Debug, Clone, Default)]
pub struct DisabledSqlExecutor;

#[async_trait]
impl SqlExecutor for DisabledSqlExecutor {
    async fn execute(
        &self,
        _file: &str,
        _statements: &[String],
    ) -> Result<SqlOutcome, SqlExecutorError> {
        Err(SqlExecutorError::Connection(
            "no database sink configured".to_string(),
        ))
    }

    async fn execute_update(&self, _sql: &str, _args: &[&str]) -> Result<u64, SqlExecutorError> {
        Err(SqlExecutorError::Connection(
            "no database sink configured".to_string(),
        ))
    }

    async fn test_connection(&self) -> bool {
        false
    }

    fn info(&self) -> String {
        "disabled (no database sink configured)".to_string()
    }
}
