// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sequential ingestion queue and its lock-free busy gauge

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reveal_structures::{Record, RecordOrigin, StableId};
use serde::Serialize;
use tokio::time::Instant;

/// A record waiting for its pipeline run
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub record: Record,
    pub stable_id: StableId,
    pub origin: RecordOrigin,
    pub enqueued_at: Instant,
}

impl QueueEntry {
    pub fn new(record: Record, origin: RecordOrigin) -> Self {
        let stable_id = record.stable_id();
        Self {
            record,
            stable_id,
            origin,
            enqueued_at: Instant::now(),
        }
    }
}

/// Read-only view of pipeline busy-state for timers that must not touch the queue
pub trait BusySignal: Send + Sync {
    fn is_busy(&self) -> bool;
}

/// Mirrors queue length and the processing flag in atomics.
///
/// Only [`IngestionQueue`] writes it; the idle controller reads it.
#[derive(Debug, Default)]
pub struct BusyGauge {
    pending: AtomicUsize,
    processing: AtomicBool,
}

impl BusyGauge {
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }
}

impl BusySignal for BusyGauge {
    fn is_busy(&self) -> bool {
        self.processing() || self.pending() > 0
    }
}

/// Snapshot returned by `queue_status`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub processing: bool,
    pub cooldown: Duration,
    pub route_animation_enabled: bool,
}

/// FIFO of records awaiting animation. Arrival order is the only ordering.
#[derive(Debug)]
pub struct IngestionQueue {
    entries: VecDeque<QueueEntry>,
    processing: bool,
    gauge: Arc<BusyGauge>,
}

impl Default for IngestionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            processing: false,
            gauge: Arc::new(BusyGauge::default()),
        }
    }

    pub fn gauge(&self) -> Arc<BusyGauge> {
        Arc::clone(&self.gauge)
    }

    pub fn push(&mut self, entry: QueueEntry) -> usize {
        self.entries.push_back(entry);
        self.publish();
        self.entries.len()
    }

    pub fn pop_front(&mut self) -> Option<QueueEntry> {
        let entry = self.entries.pop_front();
        self.publish();
        entry
    }

    /// Drop a not-yet-started entry
    pub fn cancel(&mut self, id: &StableId) -> Option<QueueEntry> {
        let pos = self.entries.iter().position(|e| &e.stable_id == id)?;
        let entry = self.entries.remove(pos);
        self.publish();
        entry
    }

    pub fn contains(&self, id: &StableId) -> bool {
        self.entries.iter().any(|e| &e.stable_id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
        self.publish();
    }

    fn publish(&self) {
        self.gauge.pending.store(self.entries.len(), Ordering::Release);
        self.gauge.processing.store(self.processing, Ordering::Release);
    }
}
