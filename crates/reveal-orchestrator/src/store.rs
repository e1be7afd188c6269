// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Feature store and route ledger.

The store holds one ordered list of placed records per (viewport, slot) pair.
Every mutation bumps the slot revision; [`FeatureStore::take_pending_syncs`]
hands back only slots whose revision moved since the last sync, so re-syncing a
current slot never reaches the renderer.
*/

use reveal_structures::{LngLat, PathProfile, Record, RecordOrigin, StableId, Viewport, VisualSlot, SLOT_COUNT};
use serde::{Deserialize, Serialize};

/// A record as it sits in a slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedRecord {
    pub stable_id: StableId,
    pub record: Record,
    pub origin: RecordOrigin,
}

/// Slot contents to push to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot {
    pub viewport: Viewport,
    pub slot: VisualSlot,
    pub records: Vec<PlacedRecord>,
}

#[derive(Debug, Default)]
struct SlotState {
    records: Vec<PlacedRecord>,
    revision: u64,
    synced_revision: u64,
}

impl SlotState {
    fn touch(&mut self) {
        self.revision += 1;
    }

    fn is_dirty(&self) -> bool {
        self.revision != self.synced_revision
    }
}

#[derive(Debug)]
pub struct FeatureStore {
    partitions: [[SlotState; SLOT_COUNT]; 2],
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStore {
    pub fn new() -> Self {
        Self {
            partitions: std::array::from_fn(|_| std::array::from_fn(|_| SlotState::default())),
        }
    }

    fn slot_mut(&mut self, viewport: Viewport, slot: VisualSlot) -> &mut SlotState {
        &mut self.partitions[viewport.index()][slot.index()]
    }

    fn slot(&self, viewport: Viewport, slot: VisualSlot) -> &SlotState {
        &self.partitions[viewport.index()][slot.index()]
    }

    /// Append to the slot list and mark it for sync
    pub fn place(&mut self, viewport: Viewport, slot: VisualSlot, placed: PlacedRecord) {
        let state = self.slot_mut(viewport, slot);
        state.records.push(placed);
        state.touch();
    }

    pub fn records(&self, viewport: Viewport, slot: VisualSlot) -> &[PlacedRecord] {
        &self.slot(viewport, slot).records
    }

    pub fn contains(&self, id: &StableId) -> bool {
        self.locate(id).is_some()
    }

    pub fn locate(&self, id: &StableId) -> Option<(Viewport, VisualSlot)> {
        Viewport::ALL.into_iter().find_map(|vp| {
            VisualSlot::all()
                .find(|slot| self.slot(vp, *slot).records.iter().any(|p| &p.stable_id == id))
                .map(|slot| (vp, slot))
        })
    }

    /// Strip `id` from every slot of both viewports. Returns the slots it was in.
    pub fn remove(&mut self, id: &StableId) -> Vec<(Viewport, VisualSlot)> {
        let mut touched = Vec::new();
        for vp in Viewport::ALL {
            for slot in VisualSlot::all() {
                let state = self.slot_mut(vp, slot);
                let before = state.records.len();
                state.records.retain(|p| &p.stable_id != id);
                if state.records.len() != before {
                    state.touch();
                    touched.push((vp, slot));
                }
            }
        }
        touched
    }

    pub fn len(&self) -> usize {
        self.partitions
            .iter()
            .flat_map(|p| p.iter())
            .map(|s| s.records.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn viewport_len(&self, viewport: Viewport) -> usize {
        self.partitions[viewport.index()]
            .iter()
            .map(|s| s.records.len())
            .sum()
    }

    pub fn stable_ids(&self) -> impl Iterator<Item = &StableId> {
        self.partitions
            .iter()
            .flat_map(|p| p.iter())
            .flat_map(|s| s.records.iter().map(|r| &r.stable_id))
    }

    /// Snapshots of every slot changed since the previous call
    pub fn take_pending_syncs(&mut self) -> Vec<SlotSnapshot> {
        let mut out = Vec::new();
        for vp in Viewport::ALL {
            for slot in VisualSlot::all() {
                let state = self.slot_mut(vp, slot);
                if state.is_dirty() {
                    state.synced_revision = state.revision;
                    out.push(SlotSnapshot {
                        viewport: vp,
                        slot,
                        records: state.records.clone(),
                    });
                }
            }
        }
        out
    }

    /// Force a full re-sync, e.g. after the renderer rebuilt its layers
    pub fn mark_all_dirty(&mut self) {
        for state in self.partitions.iter_mut().flat_map(|p| p.iter_mut()) {
            state.touch();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub stable_id: StableId,
    pub coords: Vec<LngLat>,
    pub km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEndpoint {
    pub stable_id: StableId,
    pub at: LngLat,
}

/// What the renderer draws for recorded routes on one viewport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteLayer {
    pub routes: Vec<RouteEntry>,
    pub endpoints: Vec<RouteEndpoint>,
}

/// Recorded route-stage paths with a running distance total
#[derive(Debug, Default)]
pub struct RouteLedger {
    layers: [RouteLayer; 2],
    total_km: f64,
}

impl RouteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, viewport: Viewport, stable_id: StableId, profile: &PathProfile) -> f64 {
        let km = profile.total_km();
        let layer = &mut self.layers[viewport.index()];
        if let Some(at) = profile.endpoint() {
            layer.endpoints.push(RouteEndpoint {
                stable_id: stable_id.clone(),
                at,
            });
        }
        layer.routes.push(RouteEntry {
            stable_id,
            coords: profile.coords().to_vec(),
            km,
        });
        self.total_km += km;
        km
    }

    /// Drop every path and endpoint of `id`. Returns the affected viewports and the
    /// distance subtracted from the total.
    pub fn remove(&mut self, id: &StableId) -> (Vec<Viewport>, f64) {
        let mut removed_km = 0.0;
        let mut touched = Vec::new();
        for vp in Viewport::ALL {
            let layer = &mut self.layers[vp.index()];
            let routes_before = layer.routes.len();
            let endpoints_before = layer.endpoints.len();
            layer.routes.retain(|r| {
                if &r.stable_id == id {
                    removed_km += r.km;
                    false
                } else {
                    true
                }
            });
            layer.endpoints.retain(|e| &e.stable_id != id);
            if layer.routes.len() != routes_before || layer.endpoints.len() != endpoints_before {
                touched.push(vp);
            }
        }
        self.total_km = (self.total_km - removed_km).max(0.0);
        (touched, removed_km)
    }

    pub fn layer(&self, viewport: Viewport) -> &RouteLayer {
        &self.layers[viewport.index()]
    }

    pub fn total_km(&self) -> f64 {
        self.total_km
    }
}
