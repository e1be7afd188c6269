// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Activation feeds: each poll tick asks a feed which campaign ids became active.

- [`MockBatchGenerator`] plays a per-tick count schedule, then draws counts from a
  pool, picking ids at random from the still-inactive records.
- [`UniverseSnapshotFeed`] reloads a [`UniverseSource`] and reports the ids it
  marks active that the local universe does not.
- [`ScriptedFeed`] replays fixed batches.
*/

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::error::IngestionResult;
use crate::raw::normalize_rows;
use crate::source::UniverseSource;
use crate::universe::CampaignUniverse;

#[async_trait]
pub trait ActivationFeed: Send {
    /// Newly active ids. Ids that are unknown or already active are ignored by the caller.
    async fn next_batch(&mut self, universe: &CampaignUniverse) -> IngestionResult<Vec<u32>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBatchConfig {
    /// Batch size for the first ticks, one entry per tick
    pub counts: Vec<usize>,
    /// Batch sizes drawn uniformly once `counts` is exhausted
    pub pool: Vec<usize>,
    pub seed: Option<u64>,
}

impl Default for MockBatchConfig {
    fn default() -> Self {
        Self {
            counts: vec![1],
            pool: vec![2, 4],
            seed: None,
        }
    }
}

#[derive(Debug)]
pub struct MockBatchGenerator {
    config: MockBatchConfig,
    tick: usize,
    rng: StdRng,
}

impl MockBatchGenerator {
    pub fn new(config: MockBatchConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            tick: 0,
            rng,
        }
    }

    /// Batch size for the current tick
    fn draw_count(&mut self) -> usize {
        if let Some(count) = self.config.counts.get(self.tick) {
            return *count;
        }
        self.config
            .pool
            .choose(&mut self.rng)
            .copied()
            .or_else(|| self.config.counts.last().copied())
            .unwrap_or(1)
    }

    /// Synchronous core of [`ActivationFeed::next_batch`]
    pub fn draw(&mut self, inactive: &[u32]) -> Vec<u32> {
        let count = self.draw_count().min(inactive.len());
        self.tick += 1;
        let mut batch: Vec<u32> = inactive
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();
        batch.sort_unstable();
        batch
    }
}

#[async_trait]
impl ActivationFeed for MockBatchGenerator {
    async fn next_batch(&mut self, universe: &CampaignUniverse) -> IngestionResult<Vec<u32>> {
        let batch = self.draw(&universe.inactive_ids());
        debug!(target: "reveal-ingestion", "Mock tick {}: {:?}", self.tick, batch);
        Ok(batch)
    }
}

/// Reports records the source marks active but the local universe does not
pub struct UniverseSnapshotFeed {
    source: Arc<dyn UniverseSource>,
}

impl UniverseSnapshotFeed {
    pub fn new(source: Arc<dyn UniverseSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ActivationFeed for UniverseSnapshotFeed {
    async fn next_batch(&mut self, universe: &CampaignUniverse) -> IngestionResult<Vec<u32>> {
        let rows = self.source.load().await?;
        Ok(normalize_rows(&rows)
            .into_iter()
            .filter(|row| row.active && !universe.is_active(row.numeric_id))
            .map(|row| row.numeric_id)
            .collect())
    }
}

/// Replays fixed batches, then reports nothing
#[derive(Debug, Clone, Default)]
pub struct ScriptedFeed {
    batches: VecDeque<Vec<u32>>,
}

impl ScriptedFeed {
    pub fn new(batches: impl IntoIterator<Item = Vec<u32>>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ActivationFeed for ScriptedFeed {
    async fn next_batch(&mut self, _universe: &CampaignUniverse) -> IngestionResult<Vec<u32>> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seeded(counts: Vec<usize>, pool: Vec<usize>) -> MockBatchGenerator {
        MockBatchGenerator::new(MockBatchConfig {
            counts,
            pool,
            seed: Some(3),
        })
    }

    #[test]
    fn test_schedule_then_pool() {
        let mut generator = seeded(vec![1], vec![2, 4]);
        let inactive: Vec<u32> = (1..=20).collect();

        assert_eq!(generator.draw(&inactive).len(), 1);
        for _ in 0..10 {
            let n = generator.draw(&inactive).len();
            assert!(n == 2 || n == 4, "pool draw of {n}");
        }
    }

    #[test]
    fn test_batch_capped_by_remaining() {
        let mut generator = seeded(vec![5], vec![]);
        assert_eq!(generator.draw(&[8, 9]), vec![8, 9]);
        assert!(generator.draw(&[]).is_empty());
    }

    #[test]
    fn test_same_seed_same_batches() {
        let inactive: Vec<u32> = (0..50).collect();
        let mut a = seeded(vec![1, 3], vec![2, 4]);
        let mut b = seeded(vec![1, 3], vec![2, 4]);
        for _ in 0..6 {
            assert_eq!(a.draw(&inactive), b.draw(&inactive));
        }
    }

    proptest! {
        #[test]
        fn test_batches_are_distinct_inactive_ids(
            inactive in proptest::collection::btree_set(0u32..500, 0..60),
            seed in any::<u64>(),
        ) {
            let inactive: Vec<u32> = inactive.into_iter().collect();
            let mut generator = MockBatchGenerator::new(MockBatchConfig { counts: vec![1], pool: vec![2, 4], seed: Some(seed) });
            for _ in 0..4 {
                let batch = generator.draw(&inactive);
                prop_assert!(batch.len() <= 4);
                prop_assert!(batch.iter().all(|id| inactive.contains(id)));
                let mut dedup = batch.clone();
                dedup.dedup();
                prop_assert_eq!(dedup.len(), batch.len());
            }
        }
    }

    #[tokio::test]
    async fn test_scripted_feed_runs_dry() {
        let mut feed = ScriptedFeed::new([vec![1], vec![2, 4]]);
        let universe = CampaignUniverse::new();
        assert_eq!(feed.next_batch(&universe).await.unwrap(), vec![1]);
        assert_eq!(feed.next_batch(&universe).await.unwrap(), vec![2, 4]);
        assert!(feed.next_batch(&universe).await.unwrap().is_empty());
    }
}
