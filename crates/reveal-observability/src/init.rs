// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization for reveal
//!
//! Console output always; with the `file-logging` feature, per-crate and combined
//! JSON log files with daily rotation and run retention.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::LoggingSettings;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps file writers alive; logs are flushed when it drops
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    run_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// This run's log folder, when file logging is active
    pub fn run_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }
}

/// `EnvFilter` raising flagged crates to debug over `default_level`
pub fn build_filter(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<EnvFilter> {
    let directives = debug_flags.filter_with_default(default_level);
    EnvFilter::try_new(&directives).with_context(|| format!("Invalid log filter '{}'", directives))
}

/// Install the global subscriber
///
/// With file logging on, creates a timestamped folder:
/// ```text
/// ./logs/
///   └── run_20250101_120000/
///       ├── reveal-orchestrator.log
///       ├── reveal-ingestion.log
///       └── reveal.log (combined)
/// ```
///
/// # Errors
///
/// Fails if the filter is invalid, the log folder cannot be created, or a global
/// subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, settings: &LoggingSettings) -> Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(build_filter(debug_flags, &settings.level)?);
    layers.push(console_layer.boxed());

    #[cfg(feature = "file-logging")]
    let (file_guards, run_dir) = if settings.file_logging {
        let (guards, run_dir) = file_layers(debug_flags, settings, &mut layers)?;
        (guards, Some(run_dir))
    } else {
        (Vec::new(), None)
    };
    #[cfg(not(feature = "file-logging"))]
    let run_dir: Option<PathBuf> = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    if settings.file_logging && !cfg!(feature = "file-logging") {
        tracing::warn!(target: "reveal", "File logging requested but the file-logging feature is not compiled in");
    }
    if let Some(dir) = &run_dir {
        tracing::info!(target: "reveal", "Writing logs to {}", dir.display());
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        run_dir,
    })
}

#[cfg(feature = "file-logging")]
fn file_layers(
    debug_flags: &CrateDebugFlags,
    settings: &LoggingSettings,
    layers: &mut Vec<BoxedLayer>,
) -> Result<(Vec<tracing_appender::non_blocking::WorkerGuard>, PathBuf)> {
    use tracing_appender::rolling;

    let now = chrono::Utc::now();
    crate::retention::cleanup_old_logs(
        &settings.log_dir,
        settings.retention_days,
        settings.retention_runs.saturating_sub(1),
        now,
    )?;

    let run_folder = settings.log_dir.join(crate::retention::run_folder_name(now));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    let mut guards = Vec::new();
    for crate_name in crate::KNOWN_CRATES {
        let appender = rolling::daily(&run_folder, format!("{}.log", crate_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(EnvFilter::try_new(format!("{}=debug,off", crate_name))?)
                .boxed(),
        );
    }

    let combined = rolling::daily(&run_folder, "reveal.log");
    let (writer, guard) = tracing_appender::non_blocking(combined);
    guards.push(guard);
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(build_filter(debug_flags, &settings.level)?)
            .boxed(),
    );

    Ok((guards, run_folder))
}

/// Console-only logging at `info`
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingSettings::default())
}
