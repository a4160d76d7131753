// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sql::fake::{FakeSqlExecutor, SqlCall};
use chrono::NaiveDate;
use intake_core::{CorrelationId, ProcessingStatus};
use tempfile::TempDir;
use yare::parameterized;

const SAMPLE_LOG: &str = "\
SQL*Loader: Release 19.0.0.0.0 - Production

Control File:   /data/ctl/customers.ctl
Data File:      /data/in/customers.dat

Table CUSTOMERS, loaded from every logical record.

1000 Rows successfully loaded.
5 Rows not loaded due to data errors.

Total logical records read:          1005

Run began on Fri Mar 15 10:30:00 2024
Run ended on Fri Mar 15 10:31:02 2024
";

fn processor() -> (LoaderLogProcessor<FakeSqlExecutor>, Arc<FakeSqlExecutor>) {
    let executor = Arc::new(FakeSqlExecutor::new());
    (
        LoaderLogProcessor::new(Arc::clone(&executor)).unwrap(),
        executor,
    )
}

fn write_log(dir: &TempDir, content: &str) -> ProcessingJob {
    let path = dir.path().join("load_customers.log");
    std::fs::write(&path, content).unwrap();
    ProcessingJob {
        config_name: "loader".into(),
        path,
        size: content.len() as u64,
        detected_at_ms: 0,
        correlation_id: CorrelationId::new("c-1"),
    }
}

fn cfg(dir: &TempDir) -> WatchConfig {
    let mut cfg = WatchConfig::for_tests("loader", dir.path());
    cfg.processor_type = "sqlloader-log".into();
    cfg
}

#[test]
fn parses_all_fields_from_a_complete_log() {
    let (processor, _) = processor();
    let audit = processor.parse(SAMPLE_LOG);

    assert_eq!(audit.control_file.as_deref(), Some("/data/ctl/customers.ctl"));
    assert_eq!(audit.data_file.as_deref(), Some("/data/in/customers.dat"));
    assert_eq!(audit.table_name.as_deref(), Some("CUSTOMERS"));
    assert_eq!(audit.records_loaded, 1000);
    assert_eq!(audit.records_rejected, 5);
    assert_eq!(audit.total_records, 1005);
    assert_eq!(audit.load_status, "COMPLETED_WITH_ERRORS");
    assert_eq!(audit.error_text, None);
    assert_eq!(
        audit.run_began,
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
    );
    assert_eq!(
        audit.run_ended,
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 31, 2)
    );
}

#[test]
fn error_lines_force_error_status() {
    let (processor, _) = processor();
    let log = "SQL*Loader-501: Unable to read file\n10 Rows successfully loaded.\n";
    let audit = processor.parse(log);

    assert_eq!(audit.load_status, "ERROR");
    assert_eq!(
        audit.error_text.as_deref(),
        Some("SQL*Loader-501: Unable to read file")
    );
}

#[test]
fn multiple_error_lines_are_joined() {
    let (processor, _) = processor();
    let log = "SQL*Loader-501: Unable to read file\nSQL*Loader-2026: load was aborted\n";
    let audit = processor.parse(log);

    assert_eq!(
        audit.error_text.as_deref(),
        Some("SQL*Loader-501: Unable to read file\nSQL*Loader-2026: load was aborted")
    );
}

#[test]
fn clean_load_is_success() {
    let (processor, _) = processor();
    let audit = processor.parse("500 Rows successfully loaded.\n");
    assert_eq!(audit.load_status, "SUCCESS");
    assert_eq!(audit.records_loaded, 500);
    assert_eq!(audit.records_rejected, 0);
}

#[test]
fn missing_total_defaults_to_loaded_plus_rejected() {
    let (processor, _) = processor();
    let log = "1000 Rows successfully loaded.\n5 Rows not loaded due to data errors.\n";
    let audit = processor.parse(log);
    assert_eq!(audit.total_records, 1005);
}

#[parameterized(
    loader_format = { "Fri Mar 15 10:30:00 2024", true },
    iso_format = { "2024-03-15 10:30:00", true },
    us_format = { "03/15/2024 10:30:00", true },
    garbage = { "sometime last tuesday", false },
)]
fn date_format_candidates(text: &str, parses: bool) {
    assert_eq!(parse_log_date(text).is_some(), parses);
}

#[tokio::test]
async fn process_inserts_the_audit_row() {
    let dir = TempDir::new().unwrap();
    let (processor, executor) = processor();
    let job = write_log(&dir, SAMPLE_LOG);

    let result = processor.process(&job, &cfg(&dir)).await.unwrap();

    assert_eq!(result.status, ProcessingStatus::Success);
    assert_eq!(result.metadata.get("recordsLoaded").map(String::as_str), Some("1000"));
    assert_eq!(result.metadata.get("recordsRejected").map(String::as_str), Some("5"));
    assert_eq!(result.metadata.get("totalRecords").map(String::as_str), Some("1005"));
    assert_eq!(
        result.metadata.get("loadStatus").map(String::as_str),
        Some("COMPLETED_WITH_ERRORS")
    );

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    let SqlCall::ExecuteUpdate { sql, args } = &calls[0] else {
        panic!("expected an ExecuteUpdate call");
    };
    assert!(sql.contains("INSERT INTO sqlldr_log_audit"));
    assert_eq!(args[0], "load_customers.log");
    assert_eq!(args[3], "CUSTOMERS");
    assert_eq!(args[4], "1000");
    assert_eq!(args[9], "COMPLETED_WITH_ERRORS");
}

#[tokio::test]
async fn audit_insert_failure_is_a_database_error() {
    let dir = TempDir::new().unwrap();
    let (processor, executor) = processor();
    executor.fail_updates("ORA-12541: no listener");
    let job = write_log(&dir, SAMPLE_LOG);

    let err = processor.process(&job, &cfg(&dir)).await.unwrap_err();
    assert_eq!(err.category(), intake_core::ErrorCategory::Database);
}

#[tokio::test]
async fn unreadable_log_is_a_file_system_error() {
    let dir = TempDir::new().unwrap();
    let (processor, _) = processor();
    let job = ProcessingJob {
        config_name: "loader".into(),
        path: dir.path().join("missing.log"),
        size: 0,
        detected_at_ms: 0,
        correlation_id: CorrelationId::new("c-2"),
    };

    let err = processor.process(&job, &cfg(&dir)).await.unwrap_err();
    assert_eq!(err.category(), intake_core::ErrorCategory::FileSystem);
}
