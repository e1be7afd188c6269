// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
The long-lived orchestrator.

All mutable state sits in one [`OrchestratorState`] behind a `parking_lot`
mutex. The lock is only ever taken in short synchronous sections and is never
held across an `.await`, so dedup checks, store writes and queue edits are
atomic with respect to every other task.

A single drain task runs pipelines one at a time. It is started by
[`Orchestrator::enqueue`] when the queue was idle and exits when the queue runs
dry.
*/

use std::f64::consts::TAU;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reveal_structures::{
    CameraView, PathProfile, Record, RecordOrigin, StableId, Viewport, VisualSlot,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::dedup::DedupIndex;
use crate::error::OrchestratorResult;
use crate::events::{EventBus, OrchestratorEvent};
use crate::idle::{IdleConfig, IdleController, IdleState};
use crate::path::{BezierPathProvider, PathProvider};
use crate::pipeline::{PipelineConfig, PipelineHost, PipelineReport, PipelineRun};
use crate::queue::{IngestionQueue, QueueEntry, QueueStatus};
use crate::renderer::{AttractOverlay, Renderer};
use crate::store::{FeatureStore, PlacedRecord, RouteLayer, RouteLedger, SlotSnapshot};
use crate::views::ViewDefaults;

/// Orchestrator tuning
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Pause between two pipeline runs when more records are waiting
    pub cooldown: Duration,
    pub event_capacity: usize,
    /// Fixed seed for slot and bearing draws; entropy when `None`
    pub seed: Option<u64>,
    pub pipeline: PipelineConfig,
    pub idle: IdleConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(1500),
            event_capacity: 256,
            seed: None,
            pipeline: PipelineConfig::default(),
            idle: IdleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueOutcome {
    /// Accepted at this 1-based queue position
    Queued { position: usize },
    /// Already visible, queued or animating
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    /// Dropped from the queue before its pipeline started
    Cancelled,
    Removed { km_removed: f64 },
    /// Pipeline in flight; removed once it finishes
    Deferred,
    NotFound,
}

/// Everything the orchestrator mutates
struct OrchestratorState {
    store: FeatureStore,
    ledger: RouteLedger,
    dedup: DedupIndex,
    queue: IngestionQueue,
    views: ViewDefaults,
    pending_removals: AHashSet<StableId>,
    cooldown: Duration,
    route_enabled: bool,
    rng: StdRng,
}

/// Renderer work collected under the lock and replayed after it is released
#[derive(Default)]
struct RemovalEffects {
    found: bool,
    km_removed: f64,
    slots: Vec<SlotSnapshot>,
    routes: Vec<(Viewport, RouteLayer)>,
}

impl OrchestratorState {
    fn remove_now(&mut self, id: &StableId) -> RemovalEffects {
        let touched = self.store.remove(id);
        let was_visible = self.dedup.unmark_visible(id).is_some();
        let (route_vps, km_removed) = self.ledger.remove(id);

        RemovalEffects {
            found: was_visible || !touched.is_empty() || !route_vps.is_empty(),
            km_removed,
            slots: self.store.take_pending_syncs(),
            routes: route_vps
                .into_iter()
                .map(|vp| (vp, self.ledger.layer(vp).clone()))
                .collect(),
        }
    }
}

struct Inner {
    state: parking_lot::Mutex<OrchestratorState>,
    renderer: Arc<dyn Renderer>,
    paths: Arc<dyn PathProvider>,
    events: EventBus,
    idle: IdleController,
    pipeline: PipelineConfig,
}

/// Handle to the orchestrator. Clones share the same state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("status", &self.queue_status())
            .field("idle", &self.inner.idle.state())
            .finish()
    }
}

impl Orchestrator {
    /// Orchestrator with the bundled Bézier path provider
    pub fn new(
        config: OrchestratorConfig,
        renderer: Arc<dyn Renderer>,
        overlay: Arc<dyn AttractOverlay>,
    ) -> Self {
        Self::with_path_provider(config, renderer, overlay, Arc::new(BezierPathProvider::default()))
    }

    pub fn with_path_provider(
        config: OrchestratorConfig,
        renderer: Arc<dyn Renderer>,
        overlay: Arc<dyn AttractOverlay>,
        paths: Arc<dyn PathProvider>,
    ) -> Self {
        let queue = IngestionQueue::new();
        let idle = IdleController::new(config.idle, queue.gauge(), overlay);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let state = OrchestratorState {
            store: FeatureStore::new(),
            ledger: RouteLedger::new(),
            dedup: DedupIndex::new(),
            queue,
            views: ViewDefaults::default(),
            pending_removals: AHashSet::new(),
            cooldown: config.cooldown,
            route_enabled: config.pipeline.route.enabled,
            rng,
        };

        info!(
            target: "reveal-orchestrator",
            "Orchestrator ready (cooldown {:?}, route animation {})",
            config.cooldown,
            if config.pipeline.route.enabled { "on" } else { "off" }
        );

        Self {
            inner: Arc::new(Inner {
                state: parking_lot::Mutex::new(state),
                renderer,
                paths,
                events: EventBus::new(config.event_capacity),
                idle,
                pipeline: config.pipeline,
            }),
        }
    }

    // ── Queue ────────────────────────────────────────────────────────────

    /// Validate and queue a record for animation.
    ///
    /// Must be called inside a tokio runtime for the drain task to start.
    pub fn enqueue(&self, record: Record, origin: RecordOrigin) -> OrchestratorResult<EnqueueOutcome> {
        record.validate()?;
        let entry = QueueEntry::new(record, origin);
        let id = entry.stable_id.clone();

        let outcome = {
            let mut st = self.inner.state.lock();
            if st.dedup.exists(&id) {
                EnqueueOutcome::Duplicate
            } else {
                st.dedup.mark_queued(id.clone());
                EnqueueOutcome::Queued {
                    position: st.queue.push(entry),
                }
            }
        };

        match outcome {
            EnqueueOutcome::Duplicate => {
                debug!(target: "reveal-orchestrator", "Duplicate ignored: {}", id);
            }
            EnqueueOutcome::Queued { position } => {
                debug!(target: "reveal-orchestrator", "Queued {} at position {}", id, position);
                self.inner.idle.notify_activity();
                self.kick();
            }
        }
        Ok(outcome)
    }

    /// Start the drain task unless one is already running
    fn kick(&self) {
        let start = {
            let mut st = self.inner.state.lock();
            if st.queue.is_processing() || st.queue.is_empty() {
                false
            } else {
                st.queue.set_processing(true);
                true
            }
        };
        if !start {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(Inner::drain(Arc::clone(&self.inner)));
            }
            Err(_) => {
                error!(target: "reveal-orchestrator", "No tokio runtime, queue will not drain");
                self.inner.state.lock().queue.set_processing(false);
            }
        }
    }

    pub fn set_cooldown(&self, cooldown: Duration) {
        self.inner.state.lock().cooldown = cooldown;
        info!(target: "reveal-orchestrator", "Cooldown set to {:?}", cooldown);
    }

    pub fn queue_status(&self) -> QueueStatus {
        let st = self.inner.state.lock();
        QueueStatus {
            pending: st.queue.len(),
            processing: st.queue.is_processing(),
            cooldown: st.cooldown,
            route_animation_enabled: st.route_enabled,
        }
    }

    /// Takes effect from the next pipeline run
    pub fn set_route_animation_enabled(&self, enabled: bool) {
        self.inner.state.lock().route_enabled = enabled;
        info!(
            target: "reveal-orchestrator",
            "Route animation {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    // ── Store ────────────────────────────────────────────────────────────

    /// Retract a record from wherever it currently is
    pub async fn remove(&self, id: &StableId) -> RemovalOutcome {
        let effects = {
            let mut st = self.inner.state.lock();
            if st.queue.cancel(id).is_some() {
                st.dedup.unmark_queued(id);
                info!(target: "reveal-orchestrator", "Cancelled queued record {}", id);
                return RemovalOutcome::Cancelled;
            }
            if st.dedup.is_in_flight(id) {
                st.pending_removals.insert(id.clone());
                info!(target: "reveal-orchestrator", "Removal of {} deferred until its pipeline ends", id);
                return RemovalOutcome::Deferred;
            }
            st.remove_now(id)
        };

        if !effects.found {
            debug!(target: "reveal-orchestrator", "Remove: {} not found", id);
            return RemovalOutcome::NotFound;
        }
        let km_removed = effects.km_removed;
        self.inner.apply_removal(id, effects).await;
        RemovalOutcome::Removed { km_removed }
    }

    /// Place a record directly into a random slot, without any animation.
    ///
    /// Returns `None` when the record already exists.
    pub async fn place_silent(
        &self,
        record: Record,
        origin: RecordOrigin,
    ) -> OrchestratorResult<Option<VisualSlot>> {
        record.validate()?;
        let (slot, syncs) = {
            let mut st = self.inner.state.lock();
            match st.place_silent(record, origin) {
                Some(slot) => (slot, st.store.take_pending_syncs()),
                None => return Ok(None),
            }
        };
        self.inner.push_slots(syncs).await;
        Ok(Some(slot))
    }

    /// Silent placement of many records with a single renderer sync per touched slot.
    ///
    /// Invalid records and duplicates are skipped. Returns the ids actually placed.
    pub async fn place_silent_batch<I>(&self, records: I, origin: RecordOrigin) -> Vec<StableId>
    where
        I: IntoIterator<Item = Record>,
    {
        let (placed, syncs) = {
            let mut st = self.inner.state.lock();
            let mut placed = Vec::new();
            for record in records {
                if let Err(e) = record.validate() {
                    warn!(target: "reveal-orchestrator", "Skipping record {}: {}", record.id, e);
                    continue;
                }
                let id = record.stable_id();
                if st.place_silent(record, origin).is_some() {
                    placed.push(id);
                }
            }
            (placed, st.store.take_pending_syncs())
        };
        self.inner.push_slots(syncs).await;
        info!(target: "reveal-orchestrator", "Silently placed {} record(s)", placed.len());
        placed
    }

    /// Push every slot and route layer to the renderer again, e.g. after it rebuilt its layers
    pub async fn resync_renderer(&self) {
        let (syncs, routes) = {
            let mut st = self.inner.state.lock();
            st.store.mark_all_dirty();
            let routes: Vec<_> = Viewport::ALL
                .into_iter()
                .map(|vp| (vp, st.ledger.layer(vp).clone()))
                .collect();
            (st.store.take_pending_syncs(), routes)
        };
        self.inner.push_slots(syncs).await;
        self.inner.push_routes(routes).await;
    }

    pub fn exists(&self, id: &StableId) -> bool {
        self.inner.state.lock().dedup.exists(id)
    }

    pub fn is_visible(&self, id: &StableId) -> bool {
        self.inner.state.lock().dedup.is_visible(id)
    }

    pub fn locate(&self, id: &StableId) -> Option<(Viewport, VisualSlot)> {
        self.inner.state.lock().store.locate(id)
    }

    pub fn slot_records(&self, viewport: Viewport, slot: VisualSlot) -> Vec<PlacedRecord> {
        self.inner.state.lock().store.records(viewport, slot).to_vec()
    }

    pub fn visible_count(&self) -> usize {
        self.inner.state.lock().store.len()
    }

    pub fn visible_ids(&self) -> Vec<StableId> {
        self.inner.state.lock().store.stable_ids().cloned().collect()
    }

    pub fn total_route_km(&self) -> f64 {
        self.inner.state.lock().ledger.total_km()
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn default_view(&self, viewport: Viewport) -> CameraView {
        self.inner.state.lock().views.get(viewport)
    }

    /// Replace the restore target of `viewport`; non-finite views are ignored
    pub fn set_default_view(&self, viewport: Viewport, view: CameraView) -> bool {
        let accepted = self.inner.state.lock().views.set(viewport, view);
        if accepted {
            info!(target: "reveal-orchestrator", "Default view for {} updated", viewport);
        }
        accepted
    }

    pub fn save_views(&self, path: &Path) -> OrchestratorResult<()> {
        let views = self.inner.state.lock().views;
        views.save(path)
    }

    pub fn load_views(&self, path: &Path) -> OrchestratorResult<()> {
        let views = ViewDefaults::load(path)?;
        self.inner.state.lock().views = views;
        Ok(())
    }

    // ── Idle / events ────────────────────────────────────────────────────

    pub fn notify_activity(&self) {
        self.inner.idle.notify_activity();
    }

    pub fn suspend_attract(&self) {
        self.inner.idle.suspend();
    }

    pub fn resume_attract(&self) {
        self.inner.idle.resume();
    }

    pub fn disable_attract(&self) {
        self.inner.idle.disable();
    }

    pub fn idle_state(&self) -> IdleState {
        self.inner.idle.state()
    }

    pub fn idle_controller(&self) -> IdleController {
        self.inner.idle.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.inner.events.subscribe()
    }

    pub fn events(&self) -> EventBus {
        self.inner.events.clone()
    }
}

impl OrchestratorState {
    fn place_silent(&mut self, record: Record, origin: RecordOrigin) -> Option<VisualSlot> {
        let id = record.stable_id();
        if self.dedup.exists(&id) {
            return None;
        }
        let viewport = record.viewport();
        let slot = VisualSlot::random(&mut self.rng);
        self.store.place(
            viewport,
            slot,
            PlacedRecord {
                stable_id: id.clone(),
                record,
                origin,
            },
        );
        self.dedup.mark_visible(id, viewport, slot);
        Some(slot)
    }
}

impl Inner {
    async fn drain(self: Arc<Self>) {
        let mut runs = 0usize;
        loop {
            let next = {
                let mut st = self.state.lock();
                match st.queue.pop_front() {
                    Some(entry) => {
                        st.dedup.begin_flight(entry.stable_id.clone());
                        Some((entry, st.route_enabled))
                    }
                    None => {
                        st.queue.set_processing(false);
                        None
                    }
                }
            };
            let Some((entry, route_enabled)) = next else {
                break;
            };

            self.idle.notify_activity();
            let report = PipelineRun::new(
                &*self.renderer,
                &*self.paths,
                &*self,
                &self.pipeline,
                &entry,
                route_enabled,
            )
            .execute()
            .await;
            runs += 1;

            self.finish_run(&entry, report).await;
            self.idle.notify_activity();

            let (more, cooldown) = {
                let st = self.state.lock();
                (!st.queue.is_empty(), st.cooldown)
            };
            if more && !cooldown.is_zero() {
                tokio::time::sleep(cooldown).await;
            }
        }

        if runs > 0 {
            debug!(target: "reveal-orchestrator", "Queue drained after {} run(s)", runs);
            self.events.emit(OrchestratorEvent::QueueDrained);
        }
    }

    async fn finish_run(&self, entry: &QueueEntry, report: PipelineReport) {
        let deferred = {
            let mut st = self.state.lock();
            st.dedup.end_flight();
            if st.pending_removals.remove(&entry.stable_id) {
                Some(st.remove_now(&entry.stable_id))
            } else {
                None
            }
        };

        if let Some((stage, e)) = report.failure {
            self.events.emit(OrchestratorEvent::PipelineFailed {
                stable_id: entry.stable_id.clone(),
                stage,
                error: e.to_string(),
            });
        }

        if let Some(effects) = deferred {
            if effects.found {
                self.apply_removal(&entry.stable_id, effects).await;
            }
        }
    }

    async fn apply_removal(&self, id: &StableId, effects: RemovalEffects) {
        self.push_slots(effects.slots).await;
        self.push_routes(effects.routes).await;
        info!(
            target: "reveal-orchestrator",
            "Removed {} (-{:.1} km)",
            id, effects.km_removed
        );
        self.events.emit(OrchestratorEvent::RecordRemoved {
            stable_id: id.clone(),
            km_removed: effects.km_removed,
        });
    }

    async fn push_slots(&self, syncs: Vec<SlotSnapshot>) {
        let limit = self.pipeline.stage_timeout;
        for snap in syncs {
            let call = self
                .renderer
                .place_record(snap.viewport, snap.slot, &snap.records);
            match tokio::time::timeout(limit, call).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(target: "reveal-orchestrator", "Slot sync failed: {}", e),
                Err(_) => warn!(
                    target: "reveal-orchestrator",
                    "Slot sync {} {} timed out", snap.viewport, snap.slot
                ),
            }
        }
    }

    async fn push_routes(&self, routes: Vec<(Viewport, RouteLayer)>) {
        let limit = self.pipeline.stage_timeout;
        for (vp, layer) in routes {
            match tokio::time::timeout(limit, self.renderer.sync_routes(vp, &layer)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(target: "reveal-orchestrator", "Route sync failed: {}", e),
                Err(_) => warn!(target: "reveal-orchestrator", "Route sync {} timed out", vp),
            }
        }
    }
}

impl PipelineHost for Inner {
    fn draw_slot(&self) -> VisualSlot {
        VisualSlot::random(&mut self.state.lock().rng)
    }

    fn draw_bearing(&self) -> f64 {
        self.state.lock().rng.gen_range(0.0..TAU)
    }

    fn default_view(&self, viewport: Viewport) -> CameraView {
        self.state.lock().views.get(viewport)
    }

    fn commit_placement(
        &self,
        entry: &QueueEntry,
        viewport: Viewport,
        slot: VisualSlot,
    ) -> Vec<SlotSnapshot> {
        let syncs = {
            let mut st = self.state.lock();
            st.store.place(
                viewport,
                slot,
                PlacedRecord {
                    stable_id: entry.stable_id.clone(),
                    record: entry.record.clone(),
                    origin: entry.origin,
                },
            );
            st.dedup.mark_visible(entry.stable_id.clone(), viewport, slot);
            st.store.take_pending_syncs()
        };

        info!(
            target: "reveal-orchestrator",
            "✓ Painted {} on {} {}",
            entry.stable_id, viewport, slot
        );
        self.events.emit(OrchestratorEvent::Painted {
            stable_id: entry.stable_id.clone(),
            origin: entry.origin,
            record: entry.record.clone(),
            viewport,
            slot,
        });
        syncs
    }

    fn commit_route(&self, viewport: Viewport, id: &StableId, profile: &PathProfile) -> RouteLayer {
        let mut st = self.state.lock();
        let km = st.ledger.record(viewport, id.clone(), profile);
        debug!(
            target: "reveal-orchestrator",
            "Route for {}: {:.1} km (total {:.1} km)",
            id, km, st.ledger.total_km()
        );
        st.ledger.layer(viewport).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::SimulatedRenderer;
    use reveal_structures::LngLat;

    fn orchestrator() -> Orchestrator {
        let renderer = Arc::new(SimulatedRenderer::new(0.0));
        let config = OrchestratorConfig {
            seed: Some(11),
            ..OrchestratorConfig::default()
        };
        Orchestrator::new(config, renderer.clone(), renderer)
    }

    fn record(name: &str, lng: f64, lat: f64) -> Record {
        Record::new(name, name, LngLat::new(lng, lat))
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_rejects_invalid() {
        let orch = orchestrator();
        let err = orch.enqueue(record("bad", 200.0, 40.0), RecordOrigin::Manual);
        assert!(err.is_err());
        assert_eq!(orch.queue_status().pending, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_while_queued_or_in_flight() {
        let orch = orchestrator();
        let a = record("a", -3.7, 40.4);
        let b = record("b", -3.6, 40.5);

        assert_eq!(
            orch.enqueue(a.clone(), RecordOrigin::Manual).unwrap(),
            EnqueueOutcome::Queued { position: 1 }
        );
        assert_eq!(
            orch.enqueue(b.clone(), RecordOrigin::Manual).unwrap(),
            EnqueueOutcome::Queued { position: 2 }
        );
        assert_eq!(
            orch.enqueue(b, RecordOrigin::Automatic).unwrap(),
            EnqueueOutcome::Duplicate
        );

        // Let the drain task pick `a` up
        tokio::task::yield_now().await;
        assert!(orch.exists(&a.stable_id()));
        assert_eq!(
            orch.enqueue(a, RecordOrigin::Automatic).unwrap(),
            EnqueueOutcome::Duplicate
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_silent_skips_duplicates() {
        let orch = orchestrator();
        let a = record("a", -15.44, 28.10);
        let slot = orch.place_silent(a.clone(), RecordOrigin::Automatic).await.unwrap();
        assert!(slot.is_some());
        assert_eq!(orch.locate(&a.stable_id()).map(|l| l.0), Some(Viewport::Inset));
        assert_eq!(orch.place_silent(a, RecordOrigin::Automatic).await.unwrap(), None);
        assert_eq!(orch.visible_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_not_found() {
        let orch = orchestrator();
        let id = record("ghost", -3.7, 40.4).stable_id();
        assert_eq!(orch.remove(&id).await, RemovalOutcome::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_reflected_in_status() {
        let orch = orchestrator();
        orch.set_cooldown(Duration::from_millis(250));
        orch.set_route_animation_enabled(true);
        let status = orch.queue_status();
        assert_eq!(status.cooldown, Duration::from_millis(250));
        assert!(status.route_animation_enabled);
        assert!(!status.processing);
    }
}
