// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# reveal-orchestrator

Sequential orchestration of record reveals across the main and inset viewports.

Records enter through [`Orchestrator::enqueue`], are deduplicated by their
[`StableId`](reveal_structures::StableId), wait in a strict FIFO and are played
one at a time through the [`pipeline`] stages against a [`Renderer`]. The
[`idle`] controller shows an attract overlay when nothing has happened for a
while and never while a pipeline is running or records are waiting.

## Modules
- [`store`]: per-viewport, per-slot placed records and the route ledger
- [`dedup`]: visible / queued / in-flight identifier index
- [`queue`]: FIFO ingestion queue and its busy gauge
- [`pipeline`]: the per-record stage machine
- [`idle`]: idle/attract state machine
- [`renderer`], [`path`]: external seams, with simulated and Bézier defaults
- [`events`]: broadcast event bus
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dedup;
pub mod error;
pub mod events;
pub mod idle;
pub mod orchestrator;
pub mod path;
pub mod pipeline;
pub mod queue;
pub mod renderer;
pub mod store;
pub mod views;

pub use error::{OrchestratorError, OrchestratorResult, PathError, RenderError, RenderResult};
pub use events::{EventBus, OrchestratorEvent};
pub use idle::{IdleConfig, IdleController, IdleState};
pub use orchestrator::{EnqueueOutcome, Orchestrator, OrchestratorConfig, RemovalOutcome};
pub use path::{BezierPathProvider, PathProvider, RouteConfig};
pub use pipeline::{PipelineConfig, PipelineStage};
pub use queue::{BusyGauge, BusySignal, QueueStatus};
pub use renderer::{marker_position, AttractOverlay, Renderer, SimulatedRenderer};
pub use store::{PlacedRecord, RouteLayer};
pub use views::ViewDefaults;
