// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQL script processor: splits a script into statements, classifies them,
//! and hands the ordered batch to the transactional executor.
//!
//! A single scanner pass strips comments and splits on `;`, tracking string
//! literals throughout, so comment markers and semicolons inside `'...'` or
//! `"..."` never distort the split. A doubled delimiter (`''`, `""`) is an
//! escape, not a terminator.

use crate::processor::FileProcessor;
use crate::sql::SqlExecutor;
use async_trait::async_trait;
use intake_core::{ProcessError, ProcessingJob, ProcessingResult, WatchConfig};
use regex::Regex;
use std::sync::Arc;

/// Statement class used for the per-category counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Ddl,
    Dml,
    Other,
}

/// Processor for `sql-script` configurations.
pub struct SqlScriptProcessor<E: SqlExecutor> {
    executor: Arc<E>,
    ddl: Regex,
    dml: Regex,
}

impl<E: SqlExecutor> SqlScriptProcessor<E> {
    pub fn new(executor: Arc<E>) -> Result<Self, regex::Error> {
        Ok(Self {
            executor,
            ddl: Regex::new(r"(?i)^\s*(CREATE|ALTER|DROP|TRUNCATE)\b")?,
            dml: Regex::new(r"(?i)^\s*(INSERT|UPDATE|DELETE|MERGE)\b")?,
        })
    }

    fn classify(&self, statement: &str) -> StatementKind {
        if self.ddl.is_match(statement) {
            StatementKind::Ddl
        } else if self.dml.is_match(statement) {
            StatementKind::Dml
        } else {
            StatementKind::Other
        }
    }
}

#[async_trait]
impl<E: SqlExecutor> FileProcessor for SqlScriptProcessor<E> {
    fn processor_type(&self) -> &str {
        "sql-script"
    }

    async fn process(
        &self,
        job: &ProcessingJob,
        _cfg: &WatchConfig,
    ) -> Result<ProcessingResult, ProcessError> {
        let filename = job.file_name();
        let content = std::fs::read_to_string(&job.path)?;
        let statements = split_statements(&content);

        if statements.is_empty() {
            tracing::info!(file = %filename, "script is empty or comments only, skipping");
            return Ok(ProcessingResult::skipped(filename, self.processor_type())
                .with_metadata("totalStatements", 0));
        }

        let mut ddl_count = 0u32;
        let mut dml_count = 0u32;
        let mut other_count = 0u32;
        for statement in &statements {
            match self.classify(statement) {
                StatementKind::Ddl => ddl_count += 1,
                StatementKind::Dml => dml_count += 1,
                StatementKind::Other => other_count += 1,
            }
        }

        for (index, statement) in statements.iter().enumerate() {
            if !parens_balanced(statement) {
                return Ok(ProcessingResult::failure(
                    filename,
                    self.processor_type(),
                    format!("unbalanced parentheses in statement {}", index + 1),
                )
                .with_metadata("totalStatements", statements.len())
                .with_metadata("failedStatement", index + 1));
            }
        }

        let outcome = self.executor.execute(&filename, &statements).await?;

        let base = if outcome.success {
            ProcessingResult::success(filename, self.processor_type())
        } else {
            let mut message = outcome
                .error_message
                .clone()
                .unwrap_or_else(|| "statement execution failed".to_string());
            if let Some(failed) = &outcome.failed_statement {
                message = format!("{message} (statement: {failed})");
            }
            ProcessingResult::failure(filename, self.processor_type(), message)
        };

        Ok(base
            .with_duration_ms(outcome.execution_time_ms)
            .with_metadata("totalStatements", statements.len())
            .with_metadata("ddlCount", ddl_count)
            .with_metadata("dmlCount", dml_count)
            .with_metadata("otherCount", other_count)
            .with_metadata("successfulStatements", outcome.successful_statements)
            .with_metadata("executionTimeMs", outcome.execution_time_ms))
    }
}

#[derive(PartialEq, Clone, Copy)]
enum Mode {
    Plain,
    Single,
    Double,
}

/// Split a script into trimmed, non-empty statements.
///
/// Comments (`-- ...` to end of line, `/* ... */` across lines) are dropped
/// when encountered outside string literals. A trailing statement without a
/// terminating `;` is kept.
pub(crate) fn split_statements(input: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Plain;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match mode {
            Mode::Plain => match c {
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if n == '\n' {
                            current.push('\n');
                            break;
                        }
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let mut prev = '\0';
                    for n in chars.by_ref() {
                        if prev == '*' && n == '/' {
                            break;
                        }
                        prev = n;
                    }
                    // Keep tokens on either side separated.
                    current.push(' ');
                }
                ';' => {
                    push_statement(&mut statements, &mut current);
                }
                '\'' => {
                    mode = Mode::Single;
                    current.push(c);
                }
                '"' => {
                    mode = Mode::Double;
                    current.push(c);
                }
                _ => current.push(c),
            },
            Mode::Single => {
                current.push(c);
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        // Doubled delimiter: escaped quote, stay in the literal.
                        current.push('\'');
                        chars.next();
                    } else {
                        mode = Mode::Plain;
                    }
                }
            }
            Mode::Double => {
                current.push(c);
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        mode = Mode::Plain;
                    }
                }
            }
        }
    }
    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

/// Parenthesis balance check that ignores parentheses inside string
/// literals. Closing below depth zero fails immediately.
pub(crate) fn parens_balanced(statement: &str) -> bool {
    let mut depth: i64 = 0;
    let mut mode = Mode::Plain;
    let mut chars = statement.chars().peekable();

    while let Some(c) = chars.next() {
        match mode {
            Mode::Plain => match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                '\'' => mode = Mode::Single,
                '"' => mode = Mode::Double,
                _ => {}
            },
            Mode::Single => {
                if c == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                    } else {
                        mode = Mode::Plain;
                    }
                }
            }
            Mode::Double => {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                    } else {
                        mode = Mode::Plain;
                    }
                }
            }
        }
    }
    depth == 0
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
