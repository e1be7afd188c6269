// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Campaign driver: bootstrap, polling and completion tracking.

Activation and painting are decoupled by the orchestrator queue, so completion
needs both halves: every universe record active **and** every active stable id
confirmed painted. The tracker task listens to orchestrator events for the
second half and fires `CampaignComplete` exactly once.
*/

use std::sync::Arc;
use std::time::Duration;

use ahash::AHashSet;
use parking_lot::Mutex;
use reveal_orchestrator::{EnqueueOutcome, EventBus, Orchestrator, OrchestratorEvent};
use reveal_structures::{Record, RecordOrigin, StableId};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{IngestionError, IngestionResult};
use crate::feed::ActivationFeed;
use crate::raw::normalize_rows;
use crate::source::UniverseSource;
use crate::universe::CampaignUniverse;

/// Result of [`CampaignDriver::bootstrap`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapReport {
    pub universe_size: usize,
    pub active_ids: Vec<StableId>,
    /// Rows dropped by normalization
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CampaignStatus {
    pub universe_size: usize,
    pub active: usize,
    pub painted: usize,
    pub all_active: bool,
    pub complete: bool,
}

#[derive(Debug, Default)]
struct CampaignState {
    universe: CampaignUniverse,
    painted: AHashSet<StableId>,
    all_active_announced: bool,
    complete: bool,
}

impl CampaignState {
    fn all_painted(&self) -> bool {
        self.universe
            .active_stable_ids()
            .all(|id| self.painted.contains(id))
    }
}

/// Shared between the driver, its tracker and its polling task
struct Shared {
    orchestrator: Orchestrator,
    events: EventBus,
    state: Mutex<CampaignState>,
}

impl Shared {
    /// Fires completion once both halves hold. An empty universe never completes.
    fn check_complete(&self) {
        let fire = {
            let mut st = self.state.lock();
            let ready = !st.complete
                && !st.universe.is_empty()
                && st.universe.all_active()
                && st.all_painted();
            if ready {
                st.complete = true;
            }
            ready
        };
        if fire {
            info!(target: "reveal-ingestion", "🏁 Campaign complete: every record active and painted");
            self.orchestrator.disable_attract();
            self.events.emit(OrchestratorEvent::CampaignComplete);
        }
    }

    /// Announce `AllActive` the first time it holds. Returns whether it holds.
    ///
    /// An empty universe (nothing bootstrapped yet) is never all active.
    fn announce_all_active(&self) -> bool {
        let announce = {
            let mut st = self.state.lock();
            if st.universe.is_empty() || !st.universe.all_active() {
                return false;
            }
            let first = !st.all_active_announced;
            st.all_active_announced = true;
            first.then_some(st.universe.len())
        };
        if let Some(universe_size) = announce {
            info!(target: "reveal-ingestion", "All {} record(s) active, polling stops", universe_size);
            self.events.emit(OrchestratorEvent::AllActive { universe_size });
        }
        true
    }

    fn is_complete(&self) -> bool {
        self.state.lock().complete
    }

    async fn track(self: Arc<Self>, mut rx: broadcast::Receiver<OrchestratorEvent>) {
        loop {
            match rx.recv().await {
                Ok(OrchestratorEvent::Painted { stable_id, .. }) => {
                    self.state.lock().painted.insert(stable_id);
                    self.check_complete();
                }
                Ok(OrchestratorEvent::RecordRemoved { stable_id, .. }) => {
                    self.state.lock().painted.remove(&stable_id);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(target: "reveal-ingestion", "Tracker missed {} event(s), resyncing from the store", missed);
                    let visible = self.orchestrator.visible_ids();
                    self.state.lock().painted = visible.into_iter().collect();
                    self.check_complete();
                }
                Err(RecvError::Closed) => break,
            }
            if self.is_complete() {
                debug!(target: "reveal-ingestion", "Completion tracker finished");
                break;
            }
        }
    }

    async fn poll(self: Arc<Self>, interval: Duration, mut feed: Box<dyn ActivationFeed>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; polls start one interval in
        ticker.tick().await;

        while !self.announce_all_active() {
            ticker.tick().await;

            let snapshot = self.state.lock().universe.clone();
            let batch = match feed.next_batch(&snapshot).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(target: "reveal-ingestion", "Activation feed failed, retrying next tick: {}", e);
                    continue;
                }
            };

            let fresh: Vec<Record> = {
                let mut st = self.state.lock();
                batch
                    .iter()
                    .filter_map(|id| st.universe.activate(*id).map(|e| e.record.clone()))
                    .collect()
            };
            if !fresh.is_empty() {
                info!(target: "reveal-ingestion", "Poll: {} newly active record(s)", fresh.len());
            }
            for record in fresh {
                self.dispatch(record, RecordOrigin::Automatic);
            }
            // Duplicates of already painted records never produce a painted event
            self.check_complete();
        }
    }

    fn dispatch(&self, record: Record, origin: RecordOrigin) -> Option<EnqueueOutcome> {
        let label = record.label.clone();
        match self.orchestrator.enqueue(record, origin) {
            Ok(outcome) => {
                debug!(target: "reveal-ingestion", "Dispatched {}: {:?}", label, outcome);
                Some(outcome)
            }
            Err(e) => {
                warn!(target: "reveal-ingestion", "Could not enqueue {}: {}", label, e);
                None
            }
        }
    }
}

/// Feeds an [`Orchestrator`] from a campaign universe
pub struct CampaignDriver {
    shared: Arc<Shared>,
    tracker: JoinHandle<()>,
}

impl CampaignDriver {
    /// Subscribes to the orchestrator and starts the completion tracker.
    ///
    /// Create the driver before anything is enqueued so no painted event is missed.
    pub fn new(orchestrator: Orchestrator) -> IngestionResult<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| IngestionError::NoRuntime("completion tracker"))?;
        let events = orchestrator.events();
        let rx = events.subscribe();
        let shared = Arc::new(Shared {
            orchestrator,
            events,
            state: Mutex::new(CampaignState::default()),
        });
        let tracker = runtime.spawn(Arc::clone(&shared).track(rx));
        Ok(Self { shared, tracker })
    }

    /// Load the universe and silently place every record that is already active
    pub async fn bootstrap(&self, source: &dyn UniverseSource) -> IngestionResult<BootstrapReport> {
        let rows = source.load().await?;
        let normalized = normalize_rows(&rows);
        let dropped_rows = rows.len() - normalized.len();
        let universe = CampaignUniverse::from_rows(normalized);
        let universe_size = universe.len();

        let mut seen = AHashSet::new();
        let active_ids: Vec<StableId> = universe
            .active_stable_ids()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();
        let active_records: Vec<Record> = universe.active().map(|(_, e)| e.record.clone()).collect();

        {
            let mut st = self.shared.state.lock();
            st.universe = universe;
            st.all_active_announced = false;
        }

        self.shared
            .orchestrator
            .place_silent_batch(active_records, RecordOrigin::Automatic)
            .await;

        {
            let orch = &self.shared.orchestrator;
            let mut st = self.shared.state.lock();
            st.painted
                .extend(active_ids.iter().filter(|id| orch.is_visible(id)).cloned());
        }

        info!(
            target: "reveal-ingestion",
            "Bootstrap from {}: {} record(s), {} active, {} row(s) dropped",
            source.describe(),
            universe_size,
            active_ids.len(),
            dropped_rows
        );
        self.shared.events.emit(OrchestratorEvent::ActiveLoaded {
            count: active_ids.len(),
            ids: active_ids.clone(),
        });
        self.shared.check_complete();

        Ok(BootstrapReport {
            universe_size,
            active_ids,
            dropped_rows,
        })
    }

    /// Poll `feed` every `interval` until the whole universe is active
    pub fn poll(
        &self,
        interval: Duration,
        feed: Box<dyn ActivationFeed>,
    ) -> IngestionResult<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| IngestionError::NoRuntime("poller"))?;
        info!(target: "reveal-ingestion", "Polling every {:?}", interval);
        Ok(runtime.spawn(Arc::clone(&self.shared).poll(interval, feed)))
    }

    /// Activate one record by campaign id, e.g. from a manual selection.
    ///
    /// Returns `None` if the id is unknown or already active.
    pub fn activate(&self, id: u32, origin: RecordOrigin) -> Option<EnqueueOutcome> {
        let record = self
            .shared
            .state
            .lock()
            .universe
            .activate(id)
            .map(|e| e.record.clone())?;
        let outcome = self.shared.dispatch(record, origin);
        self.shared.announce_all_active();
        self.shared.check_complete();
        outcome
    }

    pub fn status(&self) -> CampaignStatus {
        let st = self.shared.state.lock();
        CampaignStatus {
            universe_size: st.universe.len(),
            active: st.universe.active_count(),
            painted: st.painted.len(),
            all_active: st.universe.all_active(),
            complete: st.complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.shared.is_complete()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.shared.orchestrator
    }
}

impl Drop for CampaignDriver {
    fn drop(&mut self) {
        self.tracker.abort();
    }
}
