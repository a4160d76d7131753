// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File lifecycle moves: completed, error, and the naming rules for both.
//!
//! All moves try a same-filesystem rename first and fall back to
//! copy+delete. Destination directories are created on demand. A successful
//! move is the commit point of a job.

use chrono::{Local, TimeZone};
use intake_core::{Clock, MetricsSink, ProcessError, WatchConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Maximum length of the sanitized error fragment embedded in a filename.
const ERROR_FRAGMENT_MAX: usize = 50;

/// Suffixes that mark a file as still being written by the producer.
const IN_USE_SUFFIXES: &[&str] = &[".tmp", ".processing"];

/// Moves processed files to their terminal directory with timestamped names.
#[derive(Clone)]
pub struct FileManager<C: Clock> {
    clock: C,
    metrics: MetricsSink,
}

impl<C: Clock> FileManager<C> {
    pub fn new(clock: C, metrics: MetricsSink) -> Self {
        Self { clock, metrics }
    }

    /// Move a successfully processed file into the completed directory.
    ///
    /// The destination is `<stem>_<yyyyMMdd_HHmmss>[.<ext>]`; on collision an
    /// incrementing suffix is appended before the extension.
    pub fn move_to_completed(
        &self,
        path: &Path,
        cfg: &WatchConfig,
    ) -> Result<PathBuf, ProcessError> {
        let dir = cfg.completed_dir();
        let name = self.timestamped_name(path, None);
        self.move_into(path, &dir, &name)
    }

    /// Move a failed file into the error directory, embedding a sanitized
    /// fragment of the error in the destination name.
    pub fn move_to_error(
        &self,
        path: &Path,
        error_details: &str,
        cfg: &WatchConfig,
    ) -> Result<PathBuf, ProcessError> {
        let dir = cfg.error_dir();
        let fragment = sanitize_error(error_details);
        let name = self.timestamped_name(path, Some(&fragment));
        self.move_into(path, &dir, &name)
    }

    /// Whether the file is still being written, judged by its suffix
    /// (`.tmp`, `.processing`, case-insensitive).
    pub fn is_in_use(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .is_some_and(|name| is_in_use_name(&name))
    }

    pub fn file_size(&self, path: &Path) -> Result<u64, ProcessError> {
        Ok(fs::metadata(path)?.len())
    }

    pub fn is_readable(&self, path: &Path) -> bool {
        fs::File::open(path).is_ok()
    }

    /// Build `<stem>_<ts>[.<ext>]` or `<stem>_ERROR_<ts>_<fragment>[.<ext>]`
    /// from the move instant.
    fn timestamped_name(&self, path: &Path, error_fragment: Option<&str>) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
        let ts = format_timestamp(self.clock.epoch_ms());

        let base = match error_fragment {
            None => format!("{stem}_{ts}"),
            Some(fragment) if fragment.is_empty() => format!("{stem}_ERROR_{ts}"),
            Some(fragment) => format!("{stem}_ERROR_{ts}_{fragment}"),
        };
        match ext {
            Some(ext) => format!("{base}.{ext}"),
            None => base,
        }
    }

    fn move_into(&self, src: &Path, dir: &Path, name: &str) -> Result<PathBuf, ProcessError> {
        fs::create_dir_all(dir)?;
        let dest = next_free_path(dir, name);
        match move_file(src, &dest) {
            Ok(()) => Ok(dest),
            Err(e) => {
                self.metrics.incr("files.move_failed", &[]);
                Err(ProcessError::FileSystem {
                    message: format!(
                        "failed to move {} to {}: {e}",
                        src.display(),
                        dest.display()
                    ),
                    source: Some(e),
                })
            }
        }
    }
}

/// In-use check on a bare filename.
pub(crate) fn is_in_use_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    IN_USE_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// First non-colliding path for `name` in `dir`: `name`, then `stem_1.ext`,
/// `stem_2.ext`, ...
pub(crate) fn next_free_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((s, e)) => (s.to_string(), Some(e.to_string())),
        None => (name.to_string(), None),
    };
    for n in 1u32.. {
        let next = match &ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = dir.join(next);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

/// Rename, falling back to copy+delete for cross-filesystem moves. The copy
/// fallback retries once on transient failure.
pub(crate) fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            if let Err(first) = copy_and_delete(src, dest) {
                tracing::debug!(
                    src = %src.display(),
                    dest = %dest.display(),
                    error = %first,
                    "copy fallback failed, retrying once"
                );
                copy_and_delete(src, dest)?;
            }
            Ok(())
        }
    }
}

fn copy_and_delete(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest)?;
    fs::remove_file(src)
}

/// Epoch milliseconds to a local `yyyyMMdd_HHmmss` stamp.
pub(crate) fn format_timestamp(epoch_ms: u64) -> String {
    match Local.timestamp_millis_opt(epoch_ms as i64) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.format("%Y%m%d_%H%M%S").to_string()
        }
        chrono::LocalResult::None => "00000000_000000".to_string(),
    }
}

/// Reduce error text to a filename-safe fragment: alphanumerics kept,
/// everything else folded to single underscores, trimmed, at most
/// [`ERROR_FRAGMENT_MAX`] characters.
pub(crate) fn sanitize_error(details: &str) -> String {
    let mut out = String::with_capacity(details.len().min(ERROR_FRAGMENT_MAX));
    for c in details.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
        if out.len() >= ERROR_FRAGMENT_MAX {
            break;
        }
    }
    let trimmed = out.trim_end_matches('_');
    trimmed[..trimmed.len().min(ERROR_FRAGMENT_MAX)].to_string()
}

#[cfg(test)]
#[path = "file_manager_tests.rs"]
mod tests;
