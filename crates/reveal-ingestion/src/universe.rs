// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The campaign universe: every known record and whether it is active yet

use std::collections::BTreeMap;

use reveal_structures::{Record, StableId};
use tracing::warn;

use crate::raw::NormalizedRow;

#[derive(Debug, Clone, PartialEq)]
pub struct UniverseEntry {
    pub record: Record,
    pub stable_id: StableId,
    pub active: bool,
}

/// Keyed by numeric campaign id. Activation is one-way.
#[derive(Debug, Clone, Default)]
pub struct CampaignUniverse {
    entries: BTreeMap<u32, UniverseEntry>,
    active_count: usize,
}

impl CampaignUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later rows with an already-seen id are ignored
    pub fn from_rows(rows: impl IntoIterator<Item = NormalizedRow>) -> Self {
        let mut universe = Self::new();
        for row in rows {
            if universe.entries.contains_key(&row.numeric_id) {
                warn!(target: "reveal-ingestion", "Duplicate campaign id {}, keeping the first row", row.numeric_id);
                continue;
            }
            if row.active {
                universe.active_count += 1;
            }
            let stable_id = row.record.stable_id();
            universe.entries.insert(
                row.numeric_id,
                UniverseEntry {
                    record: row.record,
                    stable_id,
                    active: row.active,
                },
            );
        }
        universe
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn all_active(&self) -> bool {
        self.active_count == self.entries.len()
    }

    pub fn get(&self, id: u32) -> Option<&UniverseEntry> {
        self.entries.get(&id)
    }

    pub fn is_active(&self, id: u32) -> bool {
        self.entries.get(&id).is_some_and(|e| e.active)
    }

    /// Mark `id` active. Returns the entry only when it was inactive before.
    pub fn activate(&mut self, id: u32) -> Option<&UniverseEntry> {
        let entry = self.entries.get_mut(&id)?;
        if entry.active {
            return None;
        }
        entry.active = true;
        self.active_count += 1;
        Some(entry)
    }

    pub fn active(&self) -> impl Iterator<Item = (u32, &UniverseEntry)> {
        self.entries.iter().filter(|(_, e)| e.active).map(|(k, e)| (*k, e))
    }

    /// Inactive ids in ascending order
    pub fn inactive_ids(&self) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.active)
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn active_stable_ids(&self) -> impl Iterator<Item = &StableId> {
        self.entries.values().filter(|e| e.active).map(|e| &e.stable_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reveal_structures::LngLat;

    fn row(id: u32, active: bool) -> NormalizedRow {
        NormalizedRow {
            numeric_id: id,
            record: Record::new(id.to_string(), format!("r{id}"), LngLat::new(-3.0 - id as f64 * 0.1, 40.0)),
            active,
        }
    }

    #[test]
    fn test_activation_is_monotonic() {
        let mut universe = CampaignUniverse::from_rows([row(1, true), row(2, false), row(3, false)]);
        assert_eq!(universe.len(), 3);
        assert_eq!(universe.active_count(), 1);
        assert_eq!(universe.inactive_ids(), vec![2, 3]);

        assert!(universe.activate(2).is_some());
        assert!(universe.activate(2).is_none());
        assert!(universe.activate(1).is_none());
        assert!(universe.activate(99).is_none());
        assert_eq!(universe.active_count(), 2);
        assert!(!universe.all_active());

        universe.activate(3);
        assert!(universe.all_active());
        assert_eq!(universe.active_stable_ids().count(), 3);
    }

    #[test]
    fn test_duplicate_ids_keep_first_row() {
        let universe = CampaignUniverse::from_rows([row(1, false), row(1, true)]);
        assert_eq!(universe.len(), 1);
        assert_eq!(universe.active_count(), 0);
    }
}
