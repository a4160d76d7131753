// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level error types.

use intake_core::{ConfigError, PatternError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by registry operations. Registration failures are fatal
/// for that configuration only; the registry itself keeps running.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid file pattern for '{name}': {source}")]
    Pattern {
        name: String,
        #[source]
        source: PatternError,
    },
    #[error("path exists but is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown processor type '{processor_type}' for '{name}'")]
    UnknownProcessorType {
        name: String,
        processor_type: String,
    },
    #[error("unknown configuration: {0}")]
    UnknownConfig(String),
    #[error("registry is shutting down")]
    ShuttingDown,
}
