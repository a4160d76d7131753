// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resilience behavior: degradation queue round-trip and retry exhaustion.

use crate::prelude::{wait_until, Harness};
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn degradation_queue_round_trip() {
    let h = Harness::new();
    let cfg = h.sql_config();
    h.registry.register(cfg.clone()).await.expect("register");

    // Database breaker open: the next detected file is diverted
    let breakers = Arc::clone(h.registry.pipeline().breakers());
    breakers.database.force_open();
    h.drop_file("job.sql", "SELECT 1;");

    let href = &h;
    wait_until(move || !href.queue_names().is_empty()).await;

    assert!(h.watch_names().is_empty());
    let queued = h.queue_names();
    assert_eq!(queued.len(), 1);
    assert!(queued[0].ends_with("_job.sql"), "{}", queued[0]);
    assert!(h.executor.calls().is_empty(), "no processing while degraded");

    // Recovery: the queue replays under the original name, then the file
    // processes normally
    breakers.database.force_close();
    let href = &h;
    let cfg_ref = &cfg;
    wait_until(move || !href.completed_names(cfg_ref).is_empty()).await;

    assert!(h.queue_names().is_empty());
    assert!(h.watch_names().is_empty());
    assert_eq!(h.executor.calls().len(), 1);
    assert!(h.metrics.counter("files.restored_from_queue", &[]) >= 1);
    h.registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transient_database_errors_exhaust_retries_then_fail() {
    let h = Harness::new();
    let cfg = h.sql_config();
    h.executor.fail_executes("database timeout");
    h.drop_file("doomed.sql", "SELECT 1;");

    h.registry.register(cfg.clone()).await.expect("register");
    let href = &h;
    let cfg_ref = &cfg;
    wait_until(move || !href.error_names(cfg_ref).is_empty()).await;

    // database policy: exactly 3 executor invocations
    assert_eq!(h.executor.calls().len(), 3);
    assert!(h.metrics.counter("retry.attempts", &[("name", "database")]) >= 2);
    assert_eq!(h.metrics.counter("retry.failure", &[("name", "database")]), 1);

    let errors = h.error_names(&cfg);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("_ERROR_"), "{}", errors[0]);
    assert_eq!(
        h.registry.statistics_for("sql-inbox").expect("stats").failed,
        1
    );
    h.registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn recovered_database_processes_after_transient_failures() {
    let h = Harness::new();
    let cfg = h.sql_config();
    // First two attempts fail, the third succeeds
    h.executor
        .script(Err(intake_adapters::SqlExecutorError::Database(
            "timeout".into(),
        )));
    h.executor
        .script(Err(intake_adapters::SqlExecutorError::Database(
            "timeout".into(),
        )));
    h.drop_file("flaky.sql", "SELECT 1;");

    h.registry.register(cfg.clone()).await.expect("register");
    let href = &h;
    let cfg_ref = &cfg;
    wait_until(move || !href.completed_names(cfg_ref).is_empty()).await;

    assert_eq!(h.executor.calls().len(), 3);
    assert_eq!(h.metrics.counter("retry.success", &[("name", "database")]), 1);
    assert_eq!(
        h.registry
            .statistics_for("sql-inbox")
            .expect("stats")
            .successful,
        1
    );
    h.registry.shutdown().await;
}
