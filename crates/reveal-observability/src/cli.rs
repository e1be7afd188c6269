// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-reveal-orchestrator` or `--debug-all`, plus the
//! `REVEAL_DEBUG` environment variable.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Crates raised to debug level
///
/// # Example
/// ```rust
/// use reveal_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(["--debug-reveal-orchestrator".to_string()]);
/// assert!(flags.is_enabled("reveal-orchestrator"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Looks for arguments matching `--debug-{crate-name}`; `--debug-all` enables every known crate.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = Self::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }
        flags
    }

    /// Merge a `REVEAL_DEBUG` value: `all` or comma-separated crate names
    pub fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',').map(str::trim) {
            if !crate_name.is_empty() {
                self.enable(crate_name);
            }
        }
    }

    pub fn enable(&mut self, crate_name: &str) {
        self.enabled_crates.insert(crate_name.to_string());
    }

    fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enable(crate_name);
        }
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    /// Enabled crates, sorted
    pub fn enabled_crates(&self) -> impl Iterator<Item = &str> {
        self.enabled_crates.iter().map(String::as_str)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` if enabled for `crate_name`, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Filter string for `EnvFilter` with `info` as the default level
    pub fn to_filter_string(&self) -> String {
        self.filter_with_default("info")
    }

    /// Filter string for `EnvFilter`, e.g. `reveal-orchestrator=debug,warn`
    pub fn filter_with_default(&self, default_level: &str) -> String {
        self.enabled_crates
            .iter()
            .map(|crate_name| format!("{}=debug", crate_name))
            .chain(std::iter::once(default_level.to_lowercase()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Debug flags from the process arguments and `REVEAL_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(value) = env::var("REVEAL_DEBUG") {
        flags.merge_env_value(&value);
    }
    flags
}

/// Help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  REVEAL_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  REVEAL_DEBUG=all                               Enable debug for all crates

Examples:
  --debug-reveal-orchestrator
  --debug-reveal-orchestrator --debug-reveal-ingestion
  REVEAL_DEBUG=reveal-orchestrator,reveal-ingestion
"#,
        KNOWN_CRATES.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(args(&["reveal_headless", "--debug-reveal-orchestrator"]));
        assert!(flags.is_enabled("reveal-orchestrator"));
        assert!(!flags.is_enabled("reveal-ingestion"));
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(args(&["--debug-all"]));
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_env_value_merges() {
        let mut flags = CrateDebugFlags::from_args(args(&["--debug-reveal-config"]));
        flags.merge_env_value(" reveal-ingestion , ,reveal-orchestrator");
        assert_eq!(
            flags.enabled_crates().collect::<Vec<_>>(),
            vec!["reveal-config", "reveal-ingestion", "reveal-orchestrator"]
        );
    }

    #[test]
    fn test_filter_string() {
        let flags = CrateDebugFlags::from_args(args(&["--debug-reveal-ingestion"]));
        assert_eq!(flags.to_filter_string(), "reveal-ingestion=debug,info");
        assert_eq!(flags.filter_with_default("WARN"), "reveal-ingestion=debug,warn");
        assert_eq!(CrateDebugFlags::default().to_filter_string(), "info");
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(args(&["--debug-reveal-ingestion"]));
        assert_eq!(flags.log_level("reveal-ingestion"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("reveal-orchestrator"), tracing::Level::INFO);
    }
}
