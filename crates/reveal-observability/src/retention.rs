// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Retention of per-run log directories (`run_YYYYmmdd_HHMMSS`)

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

pub(crate) const RUN_PREFIX: &str = "run_";
pub(crate) const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, thiserror::Error)]
pub enum RetentionError {
    #[error("Failed to scan log directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Folder name for a run started at `at`
pub fn run_folder_name(at: DateTime<Utc>) -> String {
    format!("{}{}", RUN_PREFIX, at.format(RUN_TIMESTAMP_FORMAT))
}

fn parse_run_folder(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name.strip_prefix(RUN_PREFIX)?;
    let naive = NaiveDateTime::parse_from_str(stamp, RUN_TIMESTAMP_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Remove run folders older than `retention_days`, then the oldest runs beyond
/// `retention_runs`. Folders that do not look like runs are left alone.
///
/// Returns how many folders were removed. Runs before logging is up, so removal
/// failures go to stderr.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u32,
    retention_runs: usize,
    now: DateTime<Utc>,
) -> Result<usize, RetentionError> {
    if !base_log_dir.exists() {
        return Ok(0);
    }
    let scan_err = |source| RetentionError::Scan {
        path: base_log_dir.to_path_buf(),
        source,
    };

    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir).map_err(scan_err)? {
        let path = entry.map_err(scan_err)?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(started) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_run_folder)
        {
            runs.push((path, started));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));
    let cutoff = now - chrono::Duration::days(i64::from(retention_days));

    let mut removed = 0;
    for (index, (path, started)) in runs.iter().enumerate() {
        if *started >= cutoff && index < retention_runs {
            continue;
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(removed)
}
