// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `reveal_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RevealConfig {
    pub queue: QueueConfig,
    pub pipeline: PipelineConfig,
    pub route: RouteConfig,
    pub idle: IdleConfig,
    pub polling: PollingConfig,
    pub views: ViewsConfig,
    pub logging: LoggingConfig,
    pub data: DataConfig,
}

/// Sequential ingestion queue
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Pause between two runs while records are waiting
    pub cooldown_ms: u64,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
    /// Seed for slot and bearing draws; entropy when absent
    pub seed: Option<u64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 1500,
            event_capacity: 256,
            seed: None,
        }
    }
}

impl QueueConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Animation pipeline timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub stage_timeout_ms: u64,
    pub expansion_timeout_ms: u64,
    pub caption_dwell_ms: u64,
    pub post_caption_dwell_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_ms: 10_000,
            expansion_timeout_ms: 600,
            caption_dwell_ms: 4000,
            post_caption_dwell_ms: 1000,
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }

    pub fn expansion_timeout(&self) -> Duration {
        Duration::from_millis(self.expansion_timeout_ms)
    }

    pub fn caption_dwell(&self) -> Duration {
        Duration::from_millis(self.caption_dwell_ms)
    }

    pub fn post_caption_dwell(&self) -> Duration {
        Duration::from_millis(self.post_caption_dwell_ms)
    }
}

/// Route animation (disabled by default)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    pub enabled: bool,
    pub target_km: f64,
    pub max_attempts: u32,
    pub attempt_timeout_ms: u64,
    pub min_km: f64,
    pub km_per_sec: f64,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub stub_offset_deg: f64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_km: 50.0,
            max_attempts: 8,
            attempt_timeout_ms: 4000,
            min_km: 2.0,
            km_per_sec: 25.0,
            min_duration_ms: 600,
            max_duration_ms: 8000,
            stub_offset_deg: 0.2,
        }
    }
}

impl RouteConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}

/// Idle/attract controller
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IdleConfig {
    pub idle_timeout_ms: u64,
    pub attract_max_ms: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 50_000,
            attract_max_ms: 20_000,
        }
    }
}

impl IdleConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn attract_max(&self) -> Duration {
        Duration::from_millis(self.attract_max_ms)
    }
}

/// Where newly active ids come from on each poll tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Random batches drawn from the inactive records
    #[default]
    Mock,
    /// Re-read the universe file and diff its active flags
    Snapshot,
}

impl std::str::FromStr for FeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "snapshot" => Ok(Self::Snapshot),
            other => Err(format!("unknown feed mode '{}'", other)),
        }
    }
}

/// Activation polling
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub feed: FeedMode,
    /// Mock batch sizes for the first ticks, one per tick
    pub mock_counts: Vec<usize>,
    /// Mock batch sizes drawn once `mock_counts` is exhausted
    pub mock_pool: Vec<usize>,
    pub mock_seed: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            feed: FeedMode::Mock,
            mock_counts: vec![1],
            mock_pool: vec![2, 4],
            mock_seed: None,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Persisted default camera views
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewsConfig {
    /// JSON snapshot loaded at startup when present
    pub snapshot_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_days: u32,
    pub max_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("logs"),
            retention_days: 7,
            max_runs: 10,
        }
    }
}

/// Campaign data
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// JSON array of campaign rows
    pub universe_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            universe_path: PathBuf::from("data/universe.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: RevealConfig = toml::from_str(
            r#"
            [route]
            enabled = true
            km_per_sec = 40.0

            [polling]
            feed = "snapshot"
            "#,
        )
        .unwrap();

        assert!(config.route.enabled);
        assert_eq!(config.route.km_per_sec, 40.0);
        assert_eq!(config.route.max_attempts, 8);
        assert_eq!(config.polling.feed, FeedMode::Snapshot);
        assert_eq!(config.polling.mock_pool, vec![2, 4]);
    }

    #[test]
    fn test_duration_helpers() {
        let config = RevealConfig::default();
        assert_eq!(config.queue.cooldown(), Duration::from_millis(1500));
        assert_eq!(config.idle.idle_timeout(), Duration::from_secs(50));
        assert_eq!(config.pipeline.expansion_timeout(), Duration::from_millis(600));
        assert_eq!(config.route.max_duration(), Duration::from_secs(8));
    }

    #[test]
    fn test_feed_mode_parse() {
        assert_eq!("Mock".parse::<FeedMode>(), Ok(FeedMode::Mock));
        assert_eq!(" snapshot ".parse::<FeedMode>(), Ok(FeedMode::Snapshot));
        assert!("kafka".parse::<FeedMode>().is_err());
    }

    #[test]
    fn test_serializes_to_json() {
        let value = serde_json::to_value(RevealConfig::default()).unwrap();
        assert_eq!(value["polling"]["feed"], "mock");
        assert_eq!(value["logging"]["level"], "info");
    }
}
