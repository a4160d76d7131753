// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sql::fake::{FakeSqlExecutor, SqlCall};
use crate::sql::{SqlExecutorError, SqlOutcome};
use intake_core::{CorrelationId, ProcessingStatus};
use std::path::PathBuf;
use tempfile::TempDir;
use yare::parameterized;

fn processor() -> (SqlScriptProcessor<FakeSqlExecutor>, Arc<FakeSqlExecutor>) {
    let executor = Arc::new(FakeSqlExecutor::new());
    (
        SqlScriptProcessor::new(Arc::clone(&executor)).unwrap(),
        executor,
    )
}

fn write_script(dir: &TempDir, content: &str) -> ProcessingJob {
    let path = dir.path().join("script.sql");
    std::fs::write(&path, content).unwrap();
    ProcessingJob {
        config_name: "inbox".into(),
        path,
        size: content.len() as u64,
        detected_at_ms: 0,
        correlation_id: CorrelationId::new("c-1"),
    }
}

fn cfg(dir: &TempDir) -> WatchConfig {
    WatchConfig::for_tests("inbox", dir.path())
}

#[parameterized(
    simple = { "SELECT 1; SELECT 2;", vec!["SELECT 1", "SELECT 2"] },
    trailing_without_semicolon = { "SELECT 1; SELECT 2", vec!["SELECT 1", "SELECT 2"] },
    semicolon_in_single_quotes = { "INSERT INTO t VALUES ('a;b');", vec!["INSERT INTO t VALUES ('a;b')"] },
    semicolon_in_double_quotes = { "SELECT \"a;b\" FROM t;", vec!["SELECT \"a;b\" FROM t"] },
    doubled_quote_escape = { "INSERT INTO t VALUES ('it''s; fine');", vec!["INSERT INTO t VALUES ('it''s; fine')"] },
    line_comment_dropped = { "SELECT 1; -- comment; with semicolon\nSELECT 2;", vec!["SELECT 1", "SELECT 2"] },
    block_comment_dropped = { "SELECT /* hidden ; */ 1;", vec!["SELECT   1"] },
    comment_marker_in_literal = { "INSERT INTO t VALUES ('-- not a comment');", vec!["INSERT INTO t VALUES ('-- not a comment')"] },
    block_marker_in_literal = { "INSERT INTO t VALUES ('/* kept */');", vec!["INSERT INTO t VALUES ('/* kept */')"] },
    empty_statements_skipped = { ";;;  ;", Vec::<&str>::new() },
    multiline_block_comment = { "/* line1\nline2 */ SELECT 1;", vec!["SELECT 1"] },
)]
fn statement_splitting(input: &str, expected: Vec<&str>) {
    assert_eq!(split_statements(input), expected);
}

#[parameterized(
    balanced = { "INSERT INTO t (a, b) VALUES (1, (2))", true },
    unbalanced_open = { "INSERT INTO t (a, b VALUES (1", false },
    unbalanced_close = { "SELECT 1)", false },
    close_before_open = { "SELECT )( ", false },
    paren_in_literal_ignored = { "INSERT INTO t VALUES ('(((')", true },
)]
fn paren_validation(statement: &str, expected: bool) {
    assert_eq!(parens_balanced(statement), expected);
}

#[tokio::test]
async fn classifies_and_executes_a_mixed_script() {
    let dir = TempDir::new().unwrap();
    let (processor, executor) = processor();
    let job = write_script(
        &dir,
        "CREATE TABLE t(id INT);\nINSERT INTO t VALUES (1);\nSELECT * FROM t;\nGRANT SELECT ON t TO u1;\n",
    );

    let result = processor.process(&job, &cfg(&dir)).await.unwrap();

    assert_eq!(result.status, ProcessingStatus::Success);
    assert_eq!(result.metadata.get("totalStatements").map(String::as_str), Some("4"));
    assert_eq!(result.metadata.get("ddlCount").map(String::as_str), Some("1"));
    assert_eq!(result.metadata.get("dmlCount").map(String::as_str), Some("1"));
    assert_eq!(result.metadata.get("otherCount").map(String::as_str), Some("2"));

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    let SqlCall::Execute { file, statements } = &calls[0] else {
        panic!("expected an Execute call");
    };
    assert_eq!(file, "script.sql");
    assert_eq!(statements.len(), 4);
    assert_eq!(statements[0], "CREATE TABLE t(id INT)");
}

#[tokio::test]
async fn empty_file_is_skipped_without_touching_the_executor() {
    let dir = TempDir::new().unwrap();
    let (processor, executor) = processor();
    let job = write_script(&dir, "");

    let result = processor.process(&job, &cfg(&dir)).await.unwrap();

    assert_eq!(result.status, ProcessingStatus::Skipped);
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn comments_only_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let (processor, executor) = processor();
    let job = write_script(&dir, "-- header\n/* block\ncomment */\n-- footer\n");

    let result = processor.process(&job, &cfg(&dir)).await.unwrap();

    assert_eq!(result.status, ProcessingStatus::Skipped);
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn unbalanced_parentheses_fail_before_execution() {
    let dir = TempDir::new().unwrap();
    let (processor, executor) = processor();
    let job = write_script(&dir, "SELECT 1;\nINSERT INTO t (a, b VALUES (1);\n");

    let result = processor.process(&job, &cfg(&dir)).await.unwrap();

    assert_eq!(result.status, ProcessingStatus::Failure);
    assert!(result
        .error_message
        .as_deref()
        .unwrap()
        .contains("unbalanced parentheses in statement 2"));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn executor_failure_produces_a_failure_result() {
    let dir = TempDir::new().unwrap();
    let (processor, executor) = processor();
    executor.script(Ok(SqlOutcome {
        success: false,
        execution_time_ms: 12,
        successful_statements: 1,
        failed_statement: Some("INSERT INTO t VALUES (2)".into()),
        error_message: Some("ORA-00001: unique constraint".into()),
    }));
    let job = write_script(&dir, "INSERT INTO t VALUES (1);\nINSERT INTO t VALUES (2);\n");

    let result = processor.process(&job, &cfg(&dir)).await.unwrap();

    assert_eq!(result.status, ProcessingStatus::Failure);
    let message = result.error_message.as_deref().unwrap();
    assert!(message.contains("ORA-00001"));
    assert!(message.contains("INSERT INTO t VALUES (2)"));
    assert_eq!(
        result.metadata.get("successfulStatements").map(String::as_str),
        Some("1")
    );
    assert_eq!(result.execution_duration_ms, 12);
}

#[tokio::test]
async fn executor_error_is_raised_as_database_error() {
    let dir = TempDir::new().unwrap();
    let (processor, executor) = processor();
    executor.script(Err(SqlExecutorError::Connection("refused".into())));
    let job = write_script(&dir, "SELECT 1;");

    let err = processor.process(&job, &cfg(&dir)).await.unwrap_err();
    assert_eq!(err.category(), intake_core::ErrorCategory::Database);
}

#[tokio::test]
async fn missing_file_is_a_file_system_error() {
    let dir = TempDir::new().unwrap();
    let (processor, _) = processor();
    let job = ProcessingJob {
        config_name: "inbox".into(),
        path: PathBuf::from(dir.path().join("ghost.sql")),
        size: 0,
        detected_at_ms: 0,
        correlation_id: CorrelationId::new("c-2"),
    };

    let err = processor.process(&job, &cfg(&dir)).await.unwrap_err();
    assert_eq!(err.category(), intake_core::ErrorCategory::FileSystem);
}
