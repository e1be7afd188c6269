// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # reveal-observability
//!
//! Logging setup shared by every reveal binary.
//!
//! Each crate logs with `target: "<crate-name>"`, so `--debug-<crate-name>`
//! flags (or `REVEAL_DEBUG`) can raise one crate to debug without flooding the
//! console with the others.
//!
//! ## Features
//! - `file-logging`: per-run directories with daily rolling JSON log files

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;
pub mod retention;

pub use cli::*;
pub use config::*;
pub use init::*;
pub use retention::{cleanup_old_logs, RetentionError};

/// Known reveal crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "reveal",
    "reveal-structures",
    "reveal-orchestrator",
    "reveal-ingestion",
    "reveal-config",
];
