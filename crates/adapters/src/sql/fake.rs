// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake SQL executor for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{SqlExecutor, SqlExecutorError, SqlOutcome};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Recorded executor call.
#[derive(Debug, Clone)]
pub enum SqlCall {
    Execute {
        file: String,
        statements: Vec<String>,
    },
    ExecuteUpdate {
        sql: String,
        args: Vec<String>,
    },
}

struct FakeSqlState {
    calls: Vec<SqlCall>,
    scripted: VecDeque<Result<SqlOutcome, SqlExecutorError>>,
    fail_executes_with: Option<String>,
    fail_updates_with: Option<String>,
    connected: bool,
}

/// Fake executor: records calls, replays scripted outcomes, succeeds by
/// default.
#[derive(Clone)]
pub struct FakeSqlExecutor {
    state: Arc<Mutex<FakeSqlState>>,
}

impl Default for FakeSqlExecutor {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeSqlState {
                calls: Vec::new(),
                scripted: VecDeque::new(),
                fail_executes_with: None,
                fail_updates_with: None,
                connected: true,
            })),
        }
    }
}

impl FakeSqlExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for the next `execute` call. Unscripted calls
    /// succeed with one outcome per statement.
    pub fn script(&self, outcome: Result<SqlOutcome, SqlExecutorError>) {
        self.state.lock().scripted.push_back(outcome);
    }

    /// Make every unscripted `execute` call fail with the given message.
    pub fn fail_executes(&self, message: &str) {
        self.state.lock().fail_executes_with = Some(message.to_string());
    }

    /// Stop failing `execute` calls.
    pub fn heal_executes(&self) {
        self.state.lock().fail_executes_with = None;
    }

    /// Make every `execute_update` call fail with the given message.
    pub fn fail_updates(&self, message: &str) {
        self.state.lock().fail_updates_with = Some(message.to_string());
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<SqlCall> {
        self.state.lock().calls.clone()
    }

    /// Statement batches handed to `execute`, flattened.
    pub fn executed_statements(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SqlCall::Execute { statements, .. } => Some(statements.clone()),
                SqlCall::ExecuteUpdate { .. } => None,
            })
            .flatten()
            .collect()
    }
}

#[async_trait]
impl SqlExecutor for FakeSqlExecutor {
    async fn execute(
        &self,
        file: &str,
        statements: &[String],
    ) -> Result<SqlOutcome, SqlExecutorError> {
        let mut state = self.state.lock();
        state.calls.push(SqlCall::Execute {
            file: file.to_string(),
            statements: statements.to_vec(),
        });
        match state.scripted.pop_front() {
            Some(outcome) => outcome,
            None => match &state.fail_executes_with {
                Some(message) => Err(SqlExecutorError::Database(message.clone())),
                None => Ok(SqlOutcome::success(statements.len() as u32, 5)),
            },
        }
    }

    async fn execute_update(&self, sql: &str, args: &[&str]) -> Result<u64, SqlExecutorError> {
        let mut state = self.state.lock();
        state.calls.push(SqlCall::ExecuteUpdate {
            sql: sql.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        match &state.fail_updates_with {
            Some(message) => Err(SqlExecutorError::Database(message.clone())),
            None => Ok(1),
        }
    }

    async fn test_connection(&self) -> bool {
        self.state.lock().connected
    }

    fn info(&self) -> String {
        "fake sql executor".to_string()
    }
}
