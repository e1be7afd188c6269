// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Observability configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging settings handed to [`init_logging`](crate::init_logging)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level for crates without a debug flag
    pub level: String,

    /// Also write JSON log files (needs the `file-logging` feature)
    pub file_logging: bool,

    /// Base directory holding one `run_*` folder per process
    pub log_dir: PathBuf,

    /// Remove runs older than this many days
    pub retention_days: u32,

    /// Keep at most this many runs
    pub retention_runs: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_days: 7,
            retention_runs: 10,
        }
    }
}
