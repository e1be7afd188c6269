// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Canonical record type and its stable identifier

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RecordError, RecordResult};
use crate::geo::LngLat;
use crate::viewport::{route, Viewport};

/// Decimal places the coordinates are rounded to inside a [`StableId`]
pub const STABLE_ID_PRECISION: usize = 5;

/// Deterministic key derived from a record's name fragment and rounded coordinates.
///
/// Every ingestion path (bootstrap, polling, manual selection) derives the key the
/// same way, so it is the only thing deduplication and counting look at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    pub fn derive(name_fragment: &str, coords: LngLat) -> Self {
        Self(format!(
            "act-{}-{:.prec$}-{:.prec$}",
            name_fragment,
            positive_zero(coords.lat),
            positive_zero(coords.lng),
            prec = STABLE_ID_PRECISION
        ))
    }

    /// Wrap an already-derived key (e.g. read back from a snapshot)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// `-0.0` would otherwise render as "-0.00000" and split one logical record in two
fn positive_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which ingestion path produced a placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    /// Discovered by polling / the activation feed
    Automatic,
    /// Selected by a person
    Manual,
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordOrigin::Automatic => f.write_str("automatic"),
            RecordOrigin::Manual => f.write_str("manual"),
        }
    }
}

/// A geographic record as the orchestrator sees it.
///
/// Produced once at the record-source boundary and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Source identifier
    pub id: String,
    /// Name fragment feeding the stable identifier
    pub name_fragment: String,
    /// Text shown in captions
    pub label: String,
    pub locality: Option<String>,
    pub coords: LngLat,
}

impl Record {
    pub fn new(id: impl Into<String>, label: impl Into<String>, coords: LngLat) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            name_fragment: label.clone(),
            label,
            locality: None,
            coords,
        }
    }

    pub fn with_name_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.name_fragment = fragment.into();
        self
    }

    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }

    pub fn validate(&self) -> RecordResult<()> {
        if self.id.trim().is_empty() {
            return Err(RecordError::EmptyId);
        }
        self.coords.validate()
    }

    pub fn stable_id(&self) -> StableId {
        StableId::derive(&self.name_fragment, self.coords)
    }

    pub fn viewport(&self) -> Viewport {
        route(self.coords.lat, self.coords.lng)
    }

    /// Caption text: label plus locality when known
    pub fn caption(&self) -> String {
        match &self.locality {
            Some(loc) if !loc.is_empty() => format!("{} ({})", self.label, loc),
            _ => self.label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_id_format() {
        let id = StableId::derive("Talleres Norte", LngLat::new(-3.7, 40.416_781_2));
        assert_eq!(id.as_str(), "act-Talleres Norte-40.41678--3.70000");
    }

    #[test]
    fn test_stable_id_rounds_to_five_places() {
        let a = StableId::derive("x", LngLat::new(-15.440_001, 28.100_001));
        let b = StableId::derive("x", LngLat::new(-15.440_002, 28.100_002));
        assert_eq!(a, b);
        let c = StableId::derive("x", LngLat::new(-15.4401, 28.1));
        assert_ne!(a, c);
    }

    #[test]
    fn test_stable_id_negative_zero() {
        let a = StableId::derive("z", LngLat::new(-0.0, 0.0));
        let b = StableId::derive("z", LngLat::new(0.0, 0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_stable_id_independent_of_source_id() {
        let coords = LngLat::new(-3.7, 40.42);
        let polled = Record::new("17", "Concesión Sur", coords);
        let manual = Record::new("sidebar-3", "Concesión Sur", coords);
        assert_eq!(polled.stable_id(), manual.stable_id());
    }

    #[test]
    fn test_validate() {
        let ok = Record::new("1", "a", LngLat::new(-3.7, 40.42));
        assert!(ok.validate().is_ok());

        let empty = Record::new("  ", "a", LngLat::new(-3.7, 40.42));
        assert_eq!(empty.validate(), Err(RecordError::EmptyId));

        let nan = Record::new("1", "a", LngLat::new(f64::INFINITY, 40.42));
        assert!(matches!(
            nan.validate(),
            Err(RecordError::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn test_caption() {
        let r = Record::new("1", "Grupo Ibérica", LngLat::new(-3.7, 40.42)).with_locality("Madrid");
        assert_eq!(r.caption(), "Grupo Ibérica (Madrid)");
    }
}
