// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# reveal-ingestion

Feeds the orchestrator from a campaign universe.

1. [`raw`] normalizes loosely typed dataset rows into [`Record`](reveal_structures::Record)s
2. [`universe`] keeps the known records and their one-way active flag
3. [`source`] loads the universe; [`feed`] reports newly active ids each poll tick
4. [`campaign`] bootstraps, polls and detects campaign completion
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod campaign;
pub mod error;
pub mod feed;
pub mod raw;
pub mod source;
pub mod universe;

pub use campaign::{BootstrapReport, CampaignDriver, CampaignStatus};
pub use error::{IngestionError, IngestionResult};
pub use feed::{ActivationFeed, MockBatchConfig, MockBatchGenerator, ScriptedFeed, UniverseSnapshotFeed};
pub use raw::{normalize_row, normalize_rows, NormalizedRow};
pub use source::{JsonFileUniverseSource, StaticUniverseSource, UniverseSource};
pub use universe::{CampaignUniverse, UniverseEntry};
