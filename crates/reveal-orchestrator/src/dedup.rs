// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Dedup index over visible, queued and in-flight stable identifiers

use ahash::{AHashMap, AHashSet};
use reveal_structures::{StableId, Viewport, VisualSlot};

/// Answers "is this record already visible, queued or animating?"
///
/// Kept in lockstep with the feature store and the queue by the orchestrator; it
/// is never mutated on its own.
#[derive(Debug, Default)]
pub struct DedupIndex {
    visible: AHashMap<StableId, (Viewport, VisualSlot)>,
    queued: AHashSet<StableId>,
    in_flight: Option<StableId>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, id: &StableId) -> bool {
        self.visible.contains_key(id) || self.queued.contains(id) || self.is_in_flight(id)
    }

    pub fn is_visible(&self, id: &StableId) -> bool {
        self.visible.contains_key(id)
    }

    pub fn is_queued(&self, id: &StableId) -> bool {
        self.queued.contains(id)
    }

    pub fn is_in_flight(&self, id: &StableId) -> bool {
        self.in_flight.as_ref() == Some(id)
    }

    pub fn location(&self, id: &StableId) -> Option<(Viewport, VisualSlot)> {
        self.visible.get(id).copied()
    }

    pub fn mark_queued(&mut self, id: StableId) {
        self.queued.insert(id);
    }

    pub fn unmark_queued(&mut self, id: &StableId) -> bool {
        self.queued.remove(id)
    }

    /// Move an identifier from queued to in flight
    pub fn begin_flight(&mut self, id: StableId) {
        self.queued.remove(&id);
        self.in_flight = Some(id);
    }

    pub fn end_flight(&mut self) -> Option<StableId> {
        self.in_flight.take()
    }

    pub fn mark_visible(&mut self, id: StableId, viewport: Viewport, slot: VisualSlot) {
        self.visible.insert(id, (viewport, slot));
    }

    pub fn unmark_visible(&mut self, id: &StableId) -> Option<(Viewport, VisualSlot)> {
        self.visible.remove(id)
    }
}
