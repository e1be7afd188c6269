// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Viewports, the inset geofence and camera defaults

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::LngLat;

/// One of the two independently addressable display regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    Main,
    Inset,
}

impl Viewport {
    pub const ALL: [Viewport; 2] = [Viewport::Main, Viewport::Inset];

    /// Dense index for per-viewport arrays
    pub const fn index(self) -> usize {
        match self {
            Viewport::Main => 0,
            Viewport::Inset => 1,
        }
    }

    /// Camera zoom used while focusing a record
    pub const fn focus_zoom(self) -> f64 {
        match self {
            Viewport::Main => 7.8,
            Viewport::Inset => 7.2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Viewport::Main => "main",
            Viewport::Inset => "inset",
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive latitude/longitude box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Geofence {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

/// Everything inside this box is drawn on the inset viewport
pub const INSET_GEOFENCE: Geofence = Geofence {
    min_lat: 27.0,
    max_lat: 29.5,
    min_lng: -18.5,
    max_lng: -13.5,
};

/// Classify coordinates into a viewport. Pure: ingestion and removal both call it
/// and must agree.
pub fn route(lat: f64, lng: f64) -> Viewport {
    if INSET_GEOFENCE.contains(lat, lng) {
        Viewport::Inset
    } else {
        Viewport::Main
    }
}

/// Camera position a viewport returns to after each animation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub center: LngLat,
    pub zoom: f64,
    #[serde(default)]
    pub bearing: f64,
    #[serde(default)]
    pub pitch: f64,
}

impl CameraView {
    pub const fn new(center: LngLat, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            bearing: 0.0,
            pitch: 0.0,
        }
    }

    /// Built-in framing for each viewport
    pub const fn default_for(viewport: Viewport) -> Self {
        match viewport {
            Viewport::Main => Self::new(
                LngLat::new(-3.625_634_990_221_584_5, 39.936_510_749_441_17),
                5.542_327_120_629_595,
            ),
            Viewport::Inset => Self::new(
                LngLat::new(-15.458_668_714_336_568, 28.422_603_127_154_147),
                5.548_587_811_931_847_5,
            ),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.center.lng.is_finite()
            && self.center.lat.is_finite()
            && self.zoom.is_finite()
            && self.bearing.is_finite()
            && self.pitch.is_finite()
    }

    /// This view if usable, otherwise the built-in default for `viewport`
    pub fn or_default_for(self, viewport: Viewport) -> Self {
        if self.is_valid() {
            self
        } else {
            Self::default_for(viewport)
        }
    }
}
