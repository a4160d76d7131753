// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor behavior through the full stack: SQL classification and
//! loader-log auditing.

use crate::prelude::{wait_until, Harness};
use intake_adapters::SqlCall;

const MIXED_SCRIPT: &str = "\
CREATE TABLE t(id INT);
INSERT INTO t VALUES (1);
SELECT * FROM t;
GRANT SELECT ON t TO u1;
";

#[tokio::test(start_paused = true)]
async fn sql_script_classification_counts() {
    let h = Harness::new();
    let cfg = h.sql_config();
    h.drop_file("mixed.sql", MIXED_SCRIPT);

    h.registry.register(cfg.clone()).await.expect("register");
    let href = &h;
    let cfg_ref = &cfg;
    wait_until(move || !href.completed_names(cfg_ref).is_empty()).await;

    // The executor received all four statements in order
    let calls = h.executor.calls();
    let SqlCall::Execute { statements, .. } = &calls[0] else {
        panic!("expected Execute");
    };
    assert_eq!(statements.len(), 4);
    assert_eq!(statements[0], "CREATE TABLE t(id INT)");
    assert_eq!(statements[3], "GRANT SELECT ON t TO u1");
    h.registry.shutdown().await;
}

const LOADER_LOG: &str = "\
Control File:   /data/ctl/orders.ctl
Data File:      /data/in/orders.dat

Table ORDERS, loaded from every logical record.

1000 Rows successfully loaded.
5 Rows not loaded due to data errors.

Run began on Fri Mar 15 10:30:00 2024
Run ended on Fri Mar 15 10:31:02 2024
";

#[tokio::test(start_paused = true)]
async fn loader_log_is_audited_with_derived_totals() {
    let h = Harness::new();
    let cfg = h.loader_config();
    h.drop_file("orders.log", LOADER_LOG);

    h.registry.register(cfg.clone()).await.expect("register");
    let href = &h;
    let cfg_ref = &cfg;
    wait_until(move || !href.completed_names(cfg_ref).is_empty()).await;

    let calls = h.executor.calls();
    assert_eq!(calls.len(), 1);
    let SqlCall::ExecuteUpdate { sql, args } = &calls[0] else {
        panic!("expected ExecuteUpdate");
    };
    assert!(sql.contains("sqlldr_log_audit"));
    assert_eq!(args[3], "ORDERS");
    assert_eq!(args[4], "1000");
    assert_eq!(args[5], "5");
    // totalRecords derived from loaded + rejected
    assert_eq!(args[6], "1005");
    assert_eq!(args[9], "COMPLETED_WITH_ERRORS");

    // The log itself processed successfully
    assert_eq!(h.completed_names(&cfg).len(), 1);
    h.registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_script_lands_in_error_dir_with_sanitized_name() {
    let h = Harness::new();
    let cfg = h.sql_config();
    h.drop_file("broken.sql", "INSERT INTO t (a, b VALUES (1);");

    h.registry.register(cfg.clone()).await.expect("register");
    let href = &h;
    let cfg_ref = &cfg;
    wait_until(move || !href.error_names(cfg_ref).is_empty()).await;

    let errors = h.error_names(&cfg);
    assert_eq!(errors.len(), 1);
    let name = &errors[0];
    assert!(name.starts_with("broken_ERROR_"), "{name}");
    assert!(name.contains("unbalanced_parentheses"), "{name}");
    assert!(name.ends_with(".sql"), "{name}");
    // The fragment carries only safe characters
    let fragment: &str = name
        .trim_start_matches("broken_ERROR_")
        .trim_end_matches(".sql");
    assert!(fragment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    h.registry.shutdown().await;
}
