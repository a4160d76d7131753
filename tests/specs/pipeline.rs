// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end pipeline behavior: ordering, filtering, lifecycle exclusivity.

use crate::prelude::{wait_until, Harness};
use intake_adapters::SqlCall;

#[tokio::test(start_paused = true)]
async fn files_are_dispatched_in_lexicographic_order() {
    let h = Harness::new();
    h.drop_file("c.sql", "SELECT 3;");
    h.drop_file("a.sql", "SELECT 1;");
    h.drop_file("b.sql", "SELECT 2;");

    h.registry.register(h.sql_config()).await.expect("register");
    let executor = h.executor.clone();
    wait_until(move || executor.calls().len() >= 3).await;

    let files: Vec<String> = h
        .executor
        .calls()
        .iter()
        .filter_map(|c| match c {
            SqlCall::Execute { file, .. } => Some(file.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(files, vec!["a.sql", "b.sql", "c.sql"]);
    h.registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn in_use_and_unmatched_files_are_never_dispatched() {
    let h = Harness::new();
    h.drop_file("script.sql", "SELECT 1;");
    h.drop_file("script.tmp", "half-written");
    h.drop_file("script.processing", "still busy");
    h.drop_file("readme.txt", "not sql");

    h.registry.register(h.sql_config()).await.expect("register");
    let executor = h.executor.clone();
    wait_until(move || !executor.calls().is_empty()).await;
    // Extra ticks must not pick up anything else
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;

    assert_eq!(h.executor.calls().len(), 1);
    assert_eq!(h.watch_names(), vec!["readme.txt", "script.processing", "script.tmp"]);
    h.registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn processed_file_leaves_the_watch_dir_exactly_once() {
    let h = Harness::new();
    let cfg = h.sql_config();
    h.drop_file("batch.sql", "INSERT INTO t VALUES (1);");

    h.registry.register(cfg.clone()).await.expect("register");
    let href = &h;
    let cfg_ref = &cfg;
    wait_until(move || !href.completed_names(cfg_ref).is_empty()).await;

    assert!(h.watch_names().is_empty());
    let completed = h.completed_names(&cfg);
    assert_eq!(completed.len(), 1);
    assert!(completed[0].starts_with("batch_"));
    assert!(completed[0].ends_with(".sql"));
    assert!(h.error_names(&cfg).is_empty());
    h.registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn statistics_balance_across_outcomes() {
    let h = Harness::new();
    h.drop_file("good.sql", "SELECT 1;");
    h.drop_file("empty.sql", "-- only a comment\n");
    h.drop_file("bad.sql", "SELECT 1)");

    h.registry.register(h.sql_config()).await.expect("register");
    let registry = &h.registry;
    wait_until(|| {
        registry
            .statistics_for("sql-inbox")
            .is_some_and(|s| s.total_processed >= 3)
    })
    .await;

    let snap = h.registry.statistics_for("sql-inbox").expect("stats");
    assert_eq!(snap.total_processed, 3);
    assert_eq!(snap.successful + snap.failed + snap.skipped, snap.total_processed);
    assert_eq!(snap.successful, 1);
    assert_eq!(snap.skipped, 1);
    assert_eq!(snap.failed, 1);
    h.registry.shutdown().await;
}
