// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed event bus between the orchestrator, the ingestion side and observers

use reveal_structures::{Record, RecordOrigin, StableId, Viewport, VisualSlot};
use tokio::sync::broadcast;
use tracing::trace;

use crate::pipeline::PipelineStage;

/// Observable, fire-and-forget notifications
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// A record became visible through the animation pipeline
    Painted {
        stable_id: StableId,
        origin: RecordOrigin,
        record: Record,
        viewport: Viewport,
        slot: VisualSlot,
    },
    /// Bootstrap finished placing the records that were already active
    ActiveLoaded { count: usize, ids: Vec<StableId> },
    /// Every record of the universe is active
    AllActive { universe_size: usize },
    /// Every record is active and painted
    CampaignComplete,
    /// The queue ran empty after at least one pipeline run
    QueueDrained,
    /// A record was retracted from the feature store
    RecordRemoved { stable_id: StableId, km_removed: f64 },
    /// A pipeline stage failed; the record was skipped
    PipelineFailed {
        stable_id: StableId,
        stage: PipelineStage,
        error: String,
    },
}

/// Broadcast sender wrapper; emitting without subscribers is not an error
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OrchestratorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn emit(&self, event: OrchestratorEvent) {
        if self.sender.send(event).is_err() {
            trace!(target: "reveal-orchestrator", "event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit(OrchestratorEvent::QueueDrained);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        bus.emit(OrchestratorEvent::AllActive { universe_size: 3 });
        bus.emit(OrchestratorEvent::CampaignComplete);
        assert_eq!(
            rx.recv().await.unwrap(),
            OrchestratorEvent::AllActive { universe_size: 3 }
        );
        assert_eq!(rx.recv().await.unwrap(), OrchestratorEvent::CampaignComplete);
    }
}
