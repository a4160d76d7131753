// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQL*Loader log processor: extracts an audit record from a loader log and
//! writes it to the relational sink.

use crate::processor::FileProcessor;
use crate::sql::SqlExecutor;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use intake_core::{ProcessError, ProcessingJob, ProcessingResult, WatchConfig};
use regex::Regex;
use std::sync::Arc;

/// Candidate timestamp formats, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%a %b %d %H:%M:%S %Y",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const AUDIT_INSERT: &str = "INSERT INTO sqlldr_log_audit \
    (log_file, control_file, data_file, table_name, records_loaded, records_rejected, \
     total_records, run_began, run_ended, load_status, error_text) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Structured record extracted from one loader log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogAuditInfo {
    pub control_file: Option<String>,
    pub data_file: Option<String>,
    pub table_name: Option<String>,
    pub records_loaded: u64,
    pub records_rejected: u64,
    pub total_records: u64,
    pub run_began: Option<NaiveDateTime>,
    pub run_ended: Option<NaiveDateTime>,
    pub load_status: String,
    pub error_text: Option<String>,
}

struct LogMatchers {
    control_file: Regex,
    data_file: Regex,
    table_name: Regex,
    rows_loaded: Regex,
    rows_rejected: Regex,
    total_records: Regex,
    run_began: Regex,
    run_ended: Regex,
    error_line: Regex,
}

impl LogMatchers {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            control_file: Regex::new(r"(?m)^Control File:\s+(\S+)")?,
            data_file: Regex::new(r"(?m)^Data File:\s+(\S+)")?,
            table_name: Regex::new(r#"(?m)^Table "?([A-Za-z0-9_$.]+)"?[,:]?"#)?,
            rows_loaded: Regex::new(r"(\d+)\s+Rows?\s+successfully loaded")?,
            rows_rejected: Regex::new(r"(\d+)\s+Rows?\s+not loaded due to data errors")?,
            total_records: Regex::new(r"Total logical records read:\s+(\d+)")?,
            run_began: Regex::new(r"(?m)^Run began on\s+(.+?)\s*$")?,
            run_ended: Regex::new(r"(?m)^Run ended on\s+(.+?)\s*$")?,
            error_line: Regex::new(r"(?m)^(SQL\*Loader-\d+:.*)$")?,
        })
    }
}

/// Processor for `sqlloader-log` configurations.
pub struct LoaderLogProcessor<E: SqlExecutor> {
    executor: Arc<E>,
    matchers: LogMatchers,
}

impl<E: SqlExecutor> LoaderLogProcessor<E> {
    pub fn new(executor: Arc<E>) -> Result<Self, regex::Error> {
        Ok(Self {
            executor,
            matchers: LogMatchers::new()?,
        })
    }

    /// Extract the audit fields from raw log text.
    pub fn parse(&self, content: &str) -> LogAuditInfo {
        let m = &self.matchers;
        let capture = |re: &Regex| {
            re.captures(content)
                .and_then(|c| c.get(1))
                .map(|g| g.as_str().to_string())
        };
        let number = |re: &Regex| {
            re.captures(content)
                .and_then(|c| c.get(1))
                .and_then(|g| g.as_str().parse::<u64>().ok())
        };

        let records_loaded = number(&m.rows_loaded).unwrap_or(0);
        let records_rejected = number(&m.rows_rejected).unwrap_or(0);
        let total_records =
            number(&m.total_records).unwrap_or(records_loaded + records_rejected);

        let errors: Vec<String> = m
            .error_line
            .captures_iter(content)
            .filter_map(|c| c.get(1).map(|g| g.as_str().to_string()))
            .collect();

        let load_status = if !errors.is_empty() {
            "ERROR"
        } else if records_rejected > 0 {
            "COMPLETED_WITH_ERRORS"
        } else {
            "SUCCESS"
        };

        LogAuditInfo {
            control_file: capture(&m.control_file),
            data_file: capture(&m.data_file),
            table_name: capture(&m.table_name),
            records_loaded,
            records_rejected,
            total_records,
            run_began: capture(&m.run_began).and_then(|s| parse_log_date(&s)),
            run_ended: capture(&m.run_ended).and_then(|s| parse_log_date(&s)),
            load_status: load_status.to_string(),
            error_text: if errors.is_empty() {
                None
            } else {
                Some(errors.join("\n"))
            },
        }
    }
}

#[async_trait]
impl<E: SqlExecutor> FileProcessor for LoaderLogProcessor<E> {
    fn processor_type(&self) -> &str {
        "sqlloader-log"
    }

    async fn process(
        &self,
        job: &ProcessingJob,
        _cfg: &WatchConfig,
    ) -> Result<ProcessingResult, ProcessError> {
        let filename = job.file_name();
        let content = std::fs::read_to_string(&job.path)?;
        let audit = self.parse(&content);

        let began = audit
            .run_began
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let ended = audit
            .run_ended
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let loaded = audit.records_loaded.to_string();
        let rejected = audit.records_rejected.to_string();
        let total = audit.total_records.to_string();

        self.executor
            .execute_update(
                AUDIT_INSERT,
                &[
                    &filename,
                    audit.control_file.as_deref().unwrap_or(""),
                    audit.data_file.as_deref().unwrap_or(""),
                    audit.table_name.as_deref().unwrap_or(""),
                    &loaded,
                    &rejected,
                    &total,
                    &began,
                    &ended,
                    &audit.load_status,
                    audit.error_text.as_deref().unwrap_or(""),
                ],
            )
            .await
            .map_err(|e| ProcessError::Database(format!("audit insert failed: {e}")))?;

        tracing::info!(
            file = %filename,
            table = audit.table_name.as_deref().unwrap_or("?"),
            loaded = audit.records_loaded,
            rejected = audit.records_rejected,
            status = %audit.load_status,
            "loader log audited"
        );

        Ok(ProcessingResult::success(filename, self.processor_type())
            .with_metadata("recordsLoaded", audit.records_loaded)
            .with_metadata("recordsRejected", audit.records_rejected)
            .with_metadata("totalRecords", audit.total_records)
            .with_metadata("loadStatus", &audit.load_status)
            .with_metadata(
                "tableName",
                audit.table_name.as_deref().unwrap_or(""),
            ))
    }
}

/// Try each candidate format in order; unparsable dates become `None`.
fn parse_log_date(text: &str) -> Option<NaiveDateTime> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
}

#[cfg(test)]
#[path = "loader_log_tests.rs"]
mod tests;
