// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn job_file_name_extracts_basename() {
    let job = ProcessingJob {
        config_name: "inbox".into(),
        path: PathBuf::from("/data/inbox/batch_01.sql"),
        size: 42,
        detected_at_ms: 1_700_000_000_000,
        correlation_id: CorrelationId::new("c-1"),
    };
    assert_eq!(job.file_name(), "batch_01.sql");
}

#[test]
fn result_builders_set_status_and_message() {
    let ok = ProcessingResult::success("a.sql", "sql-script");
    assert_eq!(ok.status, ProcessingStatus::Success);
    assert!(ok.error_message.is_none());

    let failed = ProcessingResult::failure("a.sql", "sql-script", "boom");
    assert_eq!(failed.status, ProcessingStatus::Failure);
    assert_eq!(failed.error_message.as_deref(), Some("boom"));

    let skipped = ProcessingResult::skipped("empty.sql", "sql-script");
    assert_eq!(skipped.status, ProcessingStatus::Skipped);
}

#[test]
fn metadata_builder_stringifies_values() {
    let result = ProcessingResult::success("a.sql", "sql-script")
        .with_duration_ms(125)
        .with_metadata("totalStatements", 4)
        .with_metadata("ddlCount", 1);
    assert_eq!(result.execution_duration_ms, 125);
    assert_eq!(result.metadata.get("totalStatements").map(String::as_str), Some("4"));
    assert_eq!(result.metadata.get("ddlCount").map(String::as_str), Some("1"));
}

#[test]
fn status_serializes_screaming_snake() {
    let s = serde_json::to_string(&ProcessingStatus::Success).unwrap();
    assert_eq!(s, "\"SUCCESS\"");
    assert_eq!(ProcessingStatus::Skipped.to_string(), "SKIPPED");
}
