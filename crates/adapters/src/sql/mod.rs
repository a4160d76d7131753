// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transactional executor seam to the relational sink.
//!
//! The engine never talks to a database driver directly; processors hand
//! ordered statement lists to an implementation of [`SqlExecutor`], which
//! owns connections, transactions, and DDL/DML grouping.

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use intake_core::ProcessError;
use thiserror::Error;

/// Failure from the executor.
#[derive(Debug, Error)]
pub enum SqlExecutorError {
    #[error("database error: {0}")]
    Database(String),
    #[error("connection failed: {0}")]
    Connection(String),
}

impl From<SqlExecutorError> for ProcessError {
    fn from(e: SqlExecutorError) -> Self {
        ProcessError::Database(e.to_string())
    }
}

/// Result of executing a statement batch.
#[derive(Debug, Clone, Default)]
pub struct SqlOutcome {
    pub success: bool,
    pub execution_time_ms: u64,
    pub successful_statements: u32,
    /// The statement that failed, when the batch stopped early.
    pub failed_statement: Option<String>,
    pub error_message: Option<String>,
}

impl SqlOutcome {
    pub fn success(statements: u32, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            execution_time_ms,
            successful_statements: statements,
            failed_statement: None,
            error_message: None,
        }
    }
}

/// Transactional executor over the relational sink.
///
/// The executor decides transaction boundaries; callers hand it the ordered
/// statement list and must not assume an isolation level.
#[async_trait]
pub trait SqlExecutor: Send + Sync + 'static {
    /// Execute a statement batch on behalf of `file`.
    async fn execute(
        &self,
        file: &str,
        statements: &[String],
    ) -> Result<SqlOutcome, SqlExecutorError>;

    /// Execute a single parameterized update; returns affected rows.
    async fn execute_update(&self, sql: &str, args: &[&str]) -> Result<u64, SqlExecutorError>;

    /// Cheap connectivity probe for health reporting.
    async fn test_connection(&self) -> bool;

    /// Human-readable description of the sink (dialect, target).
    fn info(&self) -> String;
}
