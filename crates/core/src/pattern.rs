// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compiled filename patterns for a watch configuration.
//!
//! Patterns are globs over the filename only (never the path): `*` matches
//! zero or more characters, `?` exactly one. Matching is case-sensitive.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;

/// A pattern failed to compile.
#[derive(Debug, Error)]
#[error("invalid file pattern: {0}")]
pub struct PatternError(#[from] globset::Error);

/// A set of filename globs compiled once at registration time.
#[derive(Debug, Clone)]
pub struct FilePatterns {
    set: GlobSet,
}

impl FilePatterns {
    /// Compile the configured globs. Fails on the first invalid pattern.
    pub fn compile(patterns: &[String]) -> Result<Self, PatternError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .case_insensitive(false)
                .build()?;
            builder.add(glob);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    /// Whether a bare filename matches at least one pattern.
    pub fn matches(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
