// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Per-record animation pipeline.

A run walks [`PipelineStage`] forward only. Stages that do not apply to the
record (expansion outside the inset, the route stage when disabled) are skipped
by [`PipelineStage::next`]. Any renderer failure or timeout jumps straight to
[`PipelineStage::Cleanup`], which always runs.

The pipeline owns no state. Store and ledger writes go through [`PipelineHost`],
which the orchestrator implements over its locked state.
*/

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reveal_structures::{CameraView, PathProfile, StableId, Viewport, VisualSlot};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{RenderError, RenderResult};
use crate::path::{acquire_route, PathProvider, RouteConfig};
use crate::queue::QueueEntry;
use crate::renderer::Renderer;
use crate::store::{RouteLayer, SlotSnapshot};

/// Pipeline states in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Attention,
    Expansion,
    Focus,
    Route,
    Placement,
    Caption,
    Restore,
    Cleanup,
    Done,
}

/// Which optional stages a run includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    pub expand: bool,
    pub route: bool,
}

impl StagePlan {
    pub fn for_run(viewport: Viewport, route_enabled: bool) -> Self {
        Self {
            expand: viewport == Viewport::Inset,
            route: route_enabled,
        }
    }
}

impl PipelineStage {
    /// Successor under `plan`; `Done` is terminal
    pub fn next(self, plan: &StagePlan) -> PipelineStage {
        use PipelineStage::*;
        match self {
            Attention if plan.expand => Expansion,
            Attention | Expansion => Focus,
            Focus if plan.route => Route,
            Focus | Route => Placement,
            Placement => Caption,
            Caption => Restore,
            Restore => Cleanup,
            Cleanup | Done => Done,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Attention => "attention",
            PipelineStage::Expansion => "expansion",
            PipelineStage::Focus => "focus",
            PipelineStage::Route => "route",
            PipelineStage::Placement => "placement",
            PipelineStage::Caption => "caption",
            PipelineStage::Restore => "restore",
            PipelineStage::Cleanup => "cleanup",
            PipelineStage::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage timings
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Upper bound for any single renderer call
    pub stage_timeout: Duration,
    /// Expansion fallback; the run proceeds as expanded when it elapses
    pub expansion_timeout: Duration,
    pub caption_dwell: Duration,
    pub post_caption_dwell: Duration,
    pub route: RouteConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(10),
            expansion_timeout: Duration::from_millis(600),
            caption_dwell: Duration::from_millis(4000),
            post_caption_dwell: Duration::from_millis(1000),
            route: RouteConfig::default(),
        }
    }
}

/// Orchestrator-side effects of a run
pub(crate) trait PipelineHost: Send + Sync {
    fn draw_slot(&self) -> VisualSlot;

    fn draw_bearing(&self) -> f64;

    fn default_view(&self, viewport: Viewport) -> CameraView;

    /// Write the record into the store and announce it. Returns the slots to sync.
    fn commit_placement(
        &self,
        entry: &QueueEntry,
        viewport: Viewport,
        slot: VisualSlot,
    ) -> Vec<SlotSnapshot>;

    /// Record a drawn route. Returns the viewport's updated layer.
    fn commit_route(&self, viewport: Viewport, id: &StableId, profile: &PathProfile) -> RouteLayer;
}

/// What happened during one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub stable_id: StableId,
    pub viewport: Viewport,
    pub visited: Vec<PipelineStage>,
    pub placed: Option<VisualSlot>,
    pub route_km: Option<f64>,
    pub failure: Option<(PipelineStage, RenderError)>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

async fn bounded<F>(operation: &'static str, limit: Duration, fut: F) -> RenderResult<()>
where
    F: Future<Output = RenderResult<()>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout {
            operation,
            timeout: limit,
        }),
    }
}

/// One record's trip through the stages
pub(crate) struct PipelineRun<'a> {
    renderer: &'a dyn Renderer,
    paths: &'a dyn PathProvider,
    host: &'a dyn PipelineHost,
    config: &'a PipelineConfig,
    entry: &'a QueueEntry,
    viewport: Viewport,
    plan: StagePlan,
    attention_shown: bool,
    expanded: bool,
    report: PipelineReport,
}

impl<'a> PipelineRun<'a> {
    pub(crate) fn new(
        renderer: &'a dyn Renderer,
        paths: &'a dyn PathProvider,
        host: &'a dyn PipelineHost,
        config: &'a PipelineConfig,
        entry: &'a QueueEntry,
        route_enabled: bool,
    ) -> Self {
        let viewport = entry.record.viewport();
        Self {
            renderer,
            paths,
            host,
            config,
            entry,
            viewport,
            plan: StagePlan::for_run(viewport, route_enabled),
            attention_shown: false,
            expanded: false,
            report: PipelineReport {
                stable_id: entry.stable_id.clone(),
                viewport,
                visited: Vec::new(),
                placed: None,
                route_km: None,
                failure: None,
            },
        }
    }

    pub(crate) async fn execute(mut self) -> PipelineReport {
        info!(
            target: "reveal-orchestrator",
            "▶ Pipeline start {} on {} ({})",
            self.entry.stable_id, self.viewport, self.entry.origin
        );

        let mut stage = PipelineStage::Attention;
        while stage != PipelineStage::Done {
            self.report.visited.push(stage);
            if stage == PipelineStage::Cleanup {
                self.cleanup().await;
                stage = PipelineStage::Done;
                continue;
            }

            stage = match self.run_stage(stage).await {
                Ok(()) => stage.next(&self.plan),
                Err(e) => {
                    warn!(
                        target: "reveal-orchestrator",
                        "Pipeline {} failed at {}: {}",
                        self.entry.stable_id, stage, e
                    );
                    self.report.failure = Some((stage, e));
                    PipelineStage::Cleanup
                }
            };
        }

        debug!(
            target: "reveal-orchestrator",
            "■ Pipeline end {} (stages: {:?})",
            self.entry.stable_id, self.report.visited
        );
        self.report
    }

    async fn run_stage(&mut self, stage: PipelineStage) -> RenderResult<()> {
        let at = self.entry.record.coords;
        let vp = self.viewport;
        let limit = self.config.stage_timeout;

        match stage {
            PipelineStage::Attention => {
                self.attention_shown = true;
                bounded("show_attention", limit, self.renderer.show_attention(vp, at)).await
            }
            PipelineStage::Expansion => {
                match tokio::time::timeout(self.config.expansion_timeout, self.renderer.expand()).await {
                    Ok(Ok(())) => {
                        self.expanded = true;
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => {
                        debug!(
                            target: "reveal-orchestrator",
                            "Expansion did not settle within {:?}, continuing",
                            self.config.expansion_timeout
                        );
                        self.expanded = true;
                        Ok(())
                    }
                }
            }
            PipelineStage::Focus => {
                bounded(
                    "focus_camera",
                    limit,
                    self.renderer.focus_camera(vp, at, vp.focus_zoom()),
                )
                .await
            }
            PipelineStage::Route => self.route_stage().await,
            PipelineStage::Placement => {
                let slot = self.host.draw_slot();
                let syncs = self.host.commit_placement(self.entry, vp, slot);
                self.report.placed = Some(slot);
                for snap in syncs {
                    bounded(
                        "place_record",
                        limit,
                        self.renderer
                            .place_record(snap.viewport, snap.slot, &snap.records),
                    )
                    .await?;
                }
                Ok(())
            }
            PipelineStage::Caption => {
                let text = self.entry.record.caption();
                bounded("show_caption", limit, self.renderer.show_caption(vp, &text, at)).await?;
                tokio::time::sleep(self.config.caption_dwell).await;
                bounded("hide_caption", limit, self.renderer.hide_caption(vp)).await
            }
            PipelineStage::Restore => {
                tokio::time::sleep(self.config.post_caption_dwell).await;
                if self.expanded {
                    bounded("collapse", limit, self.renderer.collapse()).await?;
                    self.expanded = false;
                }
                let view = self.host.default_view(vp);
                bounded("restore_camera", limit, self.renderer.restore_camera(vp, &view)).await
            }
            PipelineStage::Cleanup | PipelineStage::Done => Ok(()),
        }
    }

    async fn route_stage(&mut self) -> RenderResult<()> {
        let route_cfg = &self.config.route;
        let host = self.host;
        let acquired = acquire_route(self.paths, self.entry.record.coords, route_cfg, || {
            host.draw_bearing()
        })
        .await;

        let duration = route_cfg.draw_duration(&acquired.profile);
        bounded(
            "draw_path",
            duration + self.config.stage_timeout,
            self.renderer
                .draw_path(self.viewport, &acquired.profile, duration),
        )
        .await?;

        let layer = self
            .host
            .commit_route(self.viewport, &self.entry.stable_id, &acquired.profile);
        self.report.route_km = Some(acquired.profile.total_km());
        bounded(
            "sync_routes",
            self.config.stage_timeout,
            self.renderer.sync_routes(self.viewport, &layer),
        )
        .await
    }

    /// Best effort; failures here are logged only
    async fn cleanup(&mut self) {
        let limit = self.config.stage_timeout;
        if self.attention_shown {
            if let Err(e) = bounded(
                "clear_attention",
                limit,
                self.renderer.clear_attention(self.viewport),
            )
            .await
            {
                warn!(target: "reveal-orchestrator", "Cleanup: {}", e);
            }
        }
        if self.expanded {
            if let Err(e) = bounded("collapse", limit, self.renderer.collapse()).await {
                warn!(target: "reveal-orchestrator", "Cleanup: {}", e);
            }
            self.expanded = false;
        }
    }
}
