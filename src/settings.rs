// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Conversion of [`RevealConfig`] into the runtime configuration of each layer.
//!
//! The component crates stay independent of the config crate; this is the only
//! place that knows both shapes.

use reveal_config::RevealConfig;
use reveal_orchestrator::{IdleConfig, OrchestratorConfig, PipelineConfig, RouteConfig};

/// Orchestrator settings: queue, pipeline, route and idle sections
pub fn orchestrator_config(config: &RevealConfig) -> OrchestratorConfig {
    let route = &config.route;
    OrchestratorConfig {
        cooldown: config.queue.cooldown(),
        event_capacity: config.queue.event_capacity.max(1),
        seed: config.queue.seed,
        pipeline: PipelineConfig {
            stage_timeout: config.pipeline.stage_timeout(),
            expansion_timeout: config.pipeline.expansion_timeout(),
            caption_dwell: config.pipeline.caption_dwell(),
            post_caption_dwell: config.pipeline.post_caption_dwell(),
            route: RouteConfig {
                enabled: route.enabled,
                target_km: route.target_km,
                max_attempts: route.max_attempts,
                attempt_timeout: route.attempt_timeout(),
                min_km: route.min_km,
                km_per_sec: route.km_per_sec,
                min_duration: route.min_duration(),
                max_duration: route.max_duration(),
                stub_offset_deg: route.stub_offset_deg,
            },
        },
        idle: IdleConfig {
            idle_timeout: config.idle.idle_timeout(),
            attract_max: config.idle.attract_max(),
        },
    }
}

#[cfg(feature = "ingestion")]
pub use ingestion_settings::*;

#[cfg(feature = "ingestion")]
mod ingestion_settings {
    use std::sync::Arc;

    use reveal_config::{FeedMode, PollingConfig, RevealConfig};
    use reveal_ingestion::{
        ActivationFeed, MockBatchConfig, MockBatchGenerator, UniverseSnapshotFeed, UniverseSource,
    };

    pub fn mock_batch_config(polling: &PollingConfig) -> MockBatchConfig {
        MockBatchConfig {
            counts: polling.mock_counts.clone(),
            pool: polling.mock_pool.clone(),
            seed: polling.mock_seed,
        }
    }

    /// The configured activation feed; snapshot mode re-reads `source` every tick
    pub fn activation_feed(
        config: &RevealConfig,
        source: Arc<dyn UniverseSource>,
    ) -> Box<dyn ActivationFeed> {
        match config.polling.feed {
            FeedMode::Mock => Box::new(MockBatchGenerator::new(mock_batch_config(&config.polling))),
            FeedMode::Snapshot => Box::new(UniverseSnapshotFeed::new(source)),
        }
    }
}

/// Logging settings from the `logging` section
#[cfg(feature = "observability")]
pub fn logging_settings(config: &RevealConfig) -> reveal_observability::LoggingSettings {
    let logging = &config.logging;
    reveal_observability::LoggingSettings {
        level: logging.level.clone(),
        file_logging: logging.file_logging,
        log_dir: logging.log_dir.clone(),
        retention_days: logging.retention_days,
        retention_runs: logging.max_runs,
    }
}
