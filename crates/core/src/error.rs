// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processing error type and the category taxonomy that drives retry and
//! recovery decisions.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised anywhere in the processing pipeline.
///
/// Variants carry the failure domain where the caller knows it; `Other` is
/// classified from its message text.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("file system error: {message}")]
    FileSystem {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
    #[error("database error: {0}")]
    Database(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("external system error: {0}")]
    ExternalSystem(String),
    #[error("resource error: {0}")]
    Resource(String),
    #[error("application error: {0}")]
    Application(String),
    #[error("security error: {0}")]
    Security(String),
    #[error("{0}")]
    Other(String),
}

impl ProcessError {
    /// File system error without an underlying io source.
    pub fn file_system(message: impl Into<String>) -> Self {
        Self::FileSystem {
            message: message.into(),
            source: None,
        }
    }

    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::classify(self)
    }

    /// Stable variant name, used as the "error kind" in pattern keys.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileSystem { .. } => "FileSystem",
            Self::Database(_) => "Database",
            Self::Network(_) => "Network",
            Self::ExternalSystem(_) => "ExternalSystem",
            Self::Resource(_) => "Resource",
            Self::Application(_) => "Application",
            Self::Security(_) => "Security",
            Self::Other(_) => "Other",
        }
    }

    /// The message text without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::FileSystem { message, .. } => message,
            Self::Database(m)
            | Self::Network(m)
            | Self::ExternalSystem(m)
            | Self::Resource(m)
            | Self::Application(m)
            | Self::Security(m)
            | Self::Other(m) => m,
        }
    }
}

impl From<std::io::Error> for ProcessError {
    fn from(e: std::io::Error) -> Self {
        Self::FileSystem {
            message: e.to_string(),
            source: Some(e),
        }
    }
}

/// Failure domains, ordered by classification precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Security,
    Network,
    Database,
    Application,
    FileSystem,
    Resource,
    ExternalSystem,
    Unknown,
}

impl ErrorCategory {
    /// Whether errors in this category are worth retrying.
    pub fn retryable(self) -> bool {
        matches!(
            self,
            Self::FileSystem
                | Self::Database
                | Self::Network
                | Self::ExternalSystem
                | Self::Resource
        )
    }

    /// Classify an error, typed variants first, then the message-substring
    /// ladder in precedence order (security, network, database, application,
    /// file system, resource).
    pub fn classify(error: &ProcessError) -> Self {
        match error {
            ProcessError::FileSystem { .. } => Self::FileSystem,
            ProcessError::Database(_) => Self::Database,
            ProcessError::Network(_) => Self::Network,
            ProcessError::ExternalSystem(_) => Self::ExternalSystem,
            ProcessError::Resource(_) => Self::Resource,
            ProcessError::Application(_) => Self::Application,
            ProcessError::Security(_) => Self::Security,
            ProcessError::Other(message) => Self::classify_message(message),
        }
    }

    /// Classify free-form message text.
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |ps: &[&str]| ps.iter().any(|p| lower.contains(p));

        if has(&["security", "unauthorized", "forbidden", "authentication"]) {
            Self::Security
        } else if has(&["network", "connection", "socket", "timeout"]) {
            Self::Network
        } else if has(&["database", "sql", "temporary failure", "deadlock"]) {
            Self::Database
        } else if has(&["validation", "illegal argument", "unsupported"]) {
            Self::Application
        } else if has(&["file", "directory", "permission", "access denied", "no such"]) {
            Self::FileSystem
        } else if has(&["memory", "resource", "exhausted", "capacity"]) {
            Self::Resource
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Security => "SECURITY",
            Self::Network => "NETWORK",
            Self::Database => "DATABASE",
            Self::Application => "APPLICATION",
            Self::FileSystem => "FILE_SYSTEM",
            Self::Resource => "RESOURCE",
            Self::ExternalSystem => "EXTERNAL_SYSTEM",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
