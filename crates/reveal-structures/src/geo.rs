// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spherical geometry helpers
//!
//! All distances are great-circle distances on a sphere of radius
//! [`EARTH_RADIUS_KM`]. Coordinates follow GeoJSON order: longitude first.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RecordError, RecordResult};

/// Mean Earth radius used for every distance computation
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Build a position from latitude/longitude, rejecting non-finite or out-of-range values
    pub fn checked(lat: f64, lng: f64) -> RecordResult<Self> {
        let coords = Self::new(lng, lat);
        coords.validate()?;
        Ok(coords)
    }

    pub fn validate(&self) -> RecordResult<()> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(RecordError::NonFiniteCoordinate {
                lat: self.lat,
                lng: self.lng,
            });
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(RecordError::LatitudeOutOfRange(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(RecordError::LongitudeOutOfRange(self.lng));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Offset by raw degrees, no wrapping
    pub fn offset(&self, d_lng: f64, d_lat: f64) -> Self {
        Self::new(self.lng + d_lng, self.lat + d_lat)
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(c: LngLat) -> Self {
        [c.lng, c.lat]
    }
}

/// Great-circle distance between two positions (haversine)
pub fn haversine_km(a: LngLat, b: LngLat) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let s1 = (d_lat / 2.0).sin();
    let s2 = (d_lng / 2.0).sin();
    let h = s1 * s1 + a.lat.to_radians().cos() * b.lat.to_radians().cos() * s2 * s2;
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Summed great-circle length of a polyline
pub fn line_distance_km(coords: &[LngLat]) -> f64 {
    coords
        .windows(2)
        .map(|w| haversine_km(w[0], w[1]))
        .sum()
}

/// Project a point `km` away from `origin` along the initial bearing `bearing_rad`
/// (radians clockwise from north).
pub fn destination_at_km(origin: LngLat, km: f64, bearing_rad: f64) -> LngLat {
    let angular = km / EARTH_RADIUS_KM;
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing_rad.cos()).asin();
    let lng2 = lng1
        + (bearing_rad.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    LngLat::new(normalize_lng(lng2.to_degrees()), lat2.to_degrees())
}

fn normalize_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 540.0).rem_euclid(360.0) - 180.0
    }
}

/// A polyline annotated with cumulative great-circle distance, so a marker can be
/// moved along it at constant real-world speed.
#[derive(Debug, Clone, PartialEq)]
pub struct PathProfile {
    coords: Vec<LngLat>,
    cumulative_km: Vec<f64>,
}

impl PathProfile {
    pub fn new(coords: Vec<LngLat>) -> Self {
        let mut cumulative_km = Vec::with_capacity(coords.len());
        let mut acc = 0.0;
        for (i, c) in coords.iter().enumerate() {
            if i > 0 {
                acc += haversine_km(coords[i - 1], *c);
            }
            cumulative_km.push(acc);
        }
        Self {
            coords,
            cumulative_km,
        }
    }

    pub fn coords(&self) -> &[LngLat] {
        &self.coords
    }

    pub fn total_km(&self) -> f64 {
        self.cumulative_km.last().copied().unwrap_or(0.0)
    }

    pub fn endpoint(&self) -> Option<LngLat> {
        self.coords.last().copied()
    }

    /// Position after travelling `km` from the start, clamped to the path
    pub fn point_at_km(&self, km: f64) -> Option<LngLat> {
        let first = *self.coords.first()?;
        if self.coords.len() == 1 || km <= 0.0 {
            return Some(first);
        }
        let total = self.total_km();
        if km >= total {
            return self.endpoint();
        }

        // First segment whose far end reaches the target distance
        let idx = self
            .cumulative_km
            .windows(2)
            .position(|w| w[1] >= km)
            .unwrap_or(self.coords.len() - 2);

        let start = self.coords[idx];
        let end = self.coords[idx + 1];
        let seg = (self.cumulative_km[idx + 1] - self.cumulative_km[idx]).max(1e-6);
        let frac = ((km - self.cumulative_km[idx]) / seg).clamp(0.0, 1.0);

        Some(LngLat::new(
            start.lng + (end.lng - start.lng) * frac,
            start.lat + (end.lat - start.lat) * frac,
        ))
    }

    /// Position at `fraction` (0..=1) of the total length
    pub fn point_at_fraction(&self, fraction: f64) -> Option<LngLat> {
        self.point_at_km(self.total_km() * fraction.clamp(0.0, 1.0))
    }

    /// Travel time at a constant `km_per_sec`
    pub fn travel_duration(&self, km_per_sec: f64) -> Duration {
        if km_per_sec <= 0.0 || !km_per_sec.is_finite() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.total_km() / km_per_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MADRID: LngLat = LngLat::new(-3.7038, 40.4168);
    const BARCELONA: LngLat = LngLat::new(2.1734, 41.3851);

    #[test]
    fn test_haversine_known_distance() {
        let km = haversine_km(MADRID, BARCELONA);
        assert!((km - 505.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn test_haversine_zero() {
        assert_eq!(haversine_km(MADRID, MADRID), 0.0);
    }

    #[test]
    fn test_checked_rejects_invalid() {
        assert!(matches!(
            LngLat::checked(f64::NAN, 0.0),
            Err(RecordError::NonFiniteCoordinate { .. })
        ));
        assert_eq!(
            LngLat::checked(91.0, 0.0),
            Err(RecordError::LatitudeOutOfRange(91.0))
        );
        assert_eq!(
            LngLat::checked(0.0, -181.0),
            Err(RecordError::LongitudeOutOfRange(-181.0))
        );
        assert!(LngLat::checked(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_path_profile_uses_distance_not_point_count() {
        // Dense first half, sparse second half: the midpoint by distance must not be
        // the midpoint by index.
        let mut coords = Vec::new();
        for i in 0..=10 {
            coords.push(LngLat::new(0.0 + i as f64 * 0.01, 40.0));
        }
        coords.push(LngLat::new(0.2, 40.0));
        let profile = PathProfile::new(coords);

        let mid = profile.point_at_fraction(0.5).unwrap();
        assert!((mid.lng - 0.1).abs() < 1e-3, "midpoint lng {}", mid.lng);
        assert_eq!(profile.point_at_fraction(1.0), profile.endpoint());
    }

    #[test]
    fn test_travel_duration_proportional_to_length() {
        let short = PathProfile::new(vec![MADRID, MADRID.offset(0.1, 0.0)]);
        let long = PathProfile::new(vec![MADRID, MADRID.offset(0.2, 0.0)]);
        let ratio = long.travel_duration(10.0).as_secs_f64() / short.travel_duration(10.0).as_secs_f64();
        assert!((ratio - 2.0).abs() < 0.01);
        assert_eq!(short.travel_duration(0.0), Duration::ZERO);
    }

    #[test]
    fn test_single_point_profile() {
        let profile = PathProfile::new(vec![MADRID]);
        assert_eq!(profile.total_km(), 0.0);
        assert_eq!(profile.point_at_km(5.0), Some(MADRID));
        assert_eq!(PathProfile::new(Vec::new()).point_at_km(1.0), None);
    }

    proptest! {
        #[test]
        fn test_destination_lies_at_requested_distance(
            lat in -60.0f64..60.0,
            lng in -170.0f64..170.0,
            km in 1.0f64..500.0,
            bearing in 0.0f64..(2.0 * std::f64::consts::PI),
        ) {
            let origin = LngLat::new(lng, lat);
            let dest = destination_at_km(origin, km, bearing);
            prop_assert!(dest.is_valid());
            let measured = haversine_km(origin, dest);
            prop_assert!((measured - km).abs() < 0.01 * km + 0.01, "wanted {} got {}", km, measured);
        }
    }
}
