// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # reveal - sequential map reveal orchestration
//!
//! Geolocated campaign records are revealed one at a time on a main map and an
//! inset map: each record draws attention, zooms in, optionally traces a route,
//! lands in one of four visual slots, shows a caption and zooms back out. When
//! nothing has happened for a while an attract overlay takes over.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! reveal = "0.1"  # Default: all components
//! ```
//!
//! ## Feature Flags
//!
//! - **`full`** (default): ingestion, config and observability
//! - **`ingestion`**: universe loading, polling and campaign completion
//! - **`config`**: `reveal_configuration.toml` loader
//! - **`observability`**: logging initialization
//! - **`file-logging`**: rotating JSON log files
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reveal::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = reveal::config::load_config(None, None)?;
//! let renderer = Arc::new(SimulatedRenderer::new(1.0));
//! let outcome = HeadlessRunner::new(config, renderer.clone(), renderer)
//!     .run(std::future::pending::<()>())
//!     .await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: reveal-structures, reveal-config           │
//! │  (LngLat, Record, StableId, Viewport, VisualSlot)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Orchestration: reveal-orchestrator                     │
//! │  (store, dedup, queue, pipeline, idle controller)       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Ingestion: reveal-ingestion                            │
//! │  (universe, activation feeds, campaign completion)      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use reveal_structures as structures;

// Re-export orchestration
pub use reveal_orchestrator as orchestrator;

// Re-export optional layers
#[cfg(feature = "ingestion")]
pub use reveal_ingestion as ingestion;

#[cfg(feature = "config")]
pub use reveal_config as config;

#[cfg(feature = "observability")]
pub use reveal_observability as observability;

#[cfg(feature = "config")]
pub mod settings;

#[cfg(all(feature = "config", feature = "ingestion"))]
pub mod headless;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::structures::{
        CameraView, LngLat, Record, RecordOrigin, StableId, Viewport, VisualSlot,
    };

    pub use crate::orchestrator::{
        AttractOverlay, EnqueueOutcome, IdleState, Orchestrator, OrchestratorConfig,
        OrchestratorEvent, RemovalOutcome, Renderer, SimulatedRenderer,
    };

    #[cfg(feature = "ingestion")]
    pub use crate::ingestion::{
        CampaignDriver, CampaignStatus, JsonFileUniverseSource, MockBatchGenerator,
        StaticUniverseSource,
    };

    #[cfg(feature = "config")]
    pub use crate::config::RevealConfig;

    #[cfg(all(feature = "config", feature = "ingestion"))]
    pub use crate::headless::{HeadlessRunner, RunOutcome};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let id = Record::new("1", "Uno", LngLat::new(-3.7, 40.4)).stable_id();
        assert!(!id.as_str().is_empty());
    }
}
