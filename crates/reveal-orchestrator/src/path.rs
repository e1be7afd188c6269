// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Path acquisition for the route stage

use std::time::Duration;

use async_trait::async_trait;
use reveal_structures::geo::destination_at_km;
use reveal_structures::{LngLat, PathProfile};
use tracing::{debug, warn};

use crate::error::PathError;

/// Supplies a drawable path between two points
#[async_trait]
pub trait PathProvider: Send + Sync {
    async fn route(&self, from: LngLat, to: LngLat) -> Result<Vec<LngLat>, PathError>;
}

/// Synthesizes a gentle S-shaped cubic Bézier between the endpoints
#[derive(Debug, Clone)]
pub struct BezierPathProvider {
    steps: usize,
    /// Control point offset as a fraction of the chord length
    bend: f64,
}

impl Default for BezierPathProvider {
    fn default() -> Self {
        Self {
            steps: 120,
            bend: 0.18,
        }
    }
}

impl BezierPathProvider {
    pub fn new(steps: usize, bend: f64) -> Self {
        Self {
            steps: steps.max(1),
            bend,
        }
    }

    pub fn curve(&self, from: LngLat, to: LngLat) -> Vec<LngLat> {
        let dx = to.lng - from.lng;
        let dy = to.lat - from.lat;
        // Chord normal scaled by the bend factor
        let (px, py) = (-dy * self.bend, dx * self.bend);

        let c1 = LngLat::new(from.lng + dx / 3.0 + px, from.lat + dy / 3.0 + py);
        let c2 = LngLat::new(from.lng + dx * 2.0 / 3.0 - px, from.lat + dy * 2.0 / 3.0 - py);

        (0..=self.steps)
            .map(|i| {
                let t = i as f64 / self.steps as f64;
                let u = 1.0 - t;
                let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
                LngLat::new(
                    a * from.lng + b * c1.lng + c * c2.lng + d * to.lng,
                    a * from.lat + b * c1.lat + c * c2.lat + d * to.lat,
                )
            })
            .collect()
    }
}

#[async_trait]
impl PathProvider for BezierPathProvider {
    async fn route(&self, from: LngLat, to: LngLat) -> Result<Vec<LngLat>, PathError> {
        if !from.is_valid() || !to.is_valid() {
            return Err(PathError::Degenerate);
        }
        Ok(self.curve(from, to))
    }
}

/// Route stage tuning
#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    pub enabled: bool,
    pub target_km: f64,
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    /// Shortest acceptable path
    pub min_km: f64,
    /// Marker speed along the path
    pub km_per_sec: f64,
    pub min_duration: Duration,
    pub max_duration: Duration,
    /// Longitude offset of the fallback stub, in degrees
    pub stub_offset_deg: f64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_km: 50.0,
            max_attempts: 8,
            attempt_timeout: Duration::from_secs(4),
            min_km: 2.0,
            km_per_sec: 25.0,
            min_duration: Duration::from_millis(600),
            max_duration: Duration::from_secs(8),
            stub_offset_deg: 0.2,
        }
    }
}

impl RouteConfig {
    pub fn draw_duration(&self, profile: &PathProfile) -> Duration {
        let max = self.max_duration.max(self.min_duration);
        profile
            .travel_duration(self.km_per_sec)
            .clamp(self.min_duration, max)
    }
}

/// Outcome of [`acquire_route`]
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredRoute {
    pub profile: PathProfile,
    pub attempts: u32,
    pub fallback: bool,
}

/// Straight stub used when no acceptable path could be obtained
pub fn stub_path(origin: LngLat, offset_deg: f64) -> Vec<LngLat> {
    vec![origin, origin.offset(offset_deg, 0.0)]
}

/// Ask `provider` for a path from `origin` to a random point about
/// `config.target_km` away, re-randomizing the destination on each failure.
pub async fn acquire_route(
    provider: &dyn PathProvider,
    origin: LngLat,
    config: &RouteConfig,
    mut draw_bearing: impl FnMut() -> f64,
) -> AcquiredRoute {
    let attempts = config.max_attempts.max(1);
    for attempt in 1..=attempts {
        let destination = destination_at_km(origin, config.target_km, draw_bearing());
        let result =
            tokio::time::timeout(config.attempt_timeout, provider.route(origin, destination)).await;

        let coords = match result {
            Ok(Ok(coords)) => coords,
            Ok(Err(e)) => {
                debug!(target: "reveal-orchestrator", "Route attempt {}/{} failed: {}", attempt, attempts, e);
                continue;
            }
            Err(_) => {
                debug!(
                    target: "reveal-orchestrator",
                    "Route attempt {}/{} timed out after {:?}",
                    attempt, attempts, config.attempt_timeout
                );
                continue;
            }
        };

        match accept(coords, config.min_km) {
            Ok(profile) => {
                return AcquiredRoute {
                    profile,
                    attempts: attempt,
                    fallback: false,
                }
            }
            Err(e) => {
                debug!(target: "reveal-orchestrator", "Route attempt {}/{} rejected: {}", attempt, attempts, e);
            }
        }
    }

    warn!(
        target: "reveal-orchestrator",
        "No usable route after {} attempts, drawing stub", attempts
    );
    AcquiredRoute {
        profile: PathProfile::new(stub_path(origin, config.stub_offset_deg)),
        attempts,
        fallback: true,
    }
}

fn accept(coords: Vec<LngLat>, min_km: f64) -> Result<PathProfile, PathError> {
    if coords.len() < 2 {
        return Err(PathError::Degenerate);
    }
    let profile = PathProfile::new(coords);
    let km = profile.total_km();
    if km <= min_km {
        return Err(PathError::TooShort(km));
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reveal_structures::geo::haversine_km;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingProvider {
        calls: AtomicU32,
        succeed_on: u32,
    }

    #[async_trait]
    impl PathProvider for FailingProvider {
        async fn route(&self, from: LngLat, to: LngLat) -> Result<Vec<LngLat>, PathError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.succeed_on {
                Ok(vec![from, to])
            } else if n % 2 == 0 {
                Ok(vec![from])
            } else {
                Err(PathError::Unavailable("503".into()))
            }
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl PathProvider for HangingProvider {
        async fn route(&self, _from: LngLat, _to: LngLat) -> Result<Vec<LngLat>, PathError> {
            std::future::pending().await
        }
    }

    const ORIGIN: LngLat = LngLat::new(-3.7, 40.4);

    #[test]
    fn test_bezier_endpoints_and_steps() {
        let provider = BezierPathProvider::default();
        let to = LngLat::new(-3.1, 40.6);
        let curve = provider.curve(ORIGIN, to);
        assert_eq!(curve.len(), 121);
        assert_eq!(curve[0], ORIGIN);
        let last = curve[120];
        assert!((last.lng - to.lng).abs() < 1e-12 && (last.lat - to.lat).abs() < 1e-12);
        // Curved, so longer than the chord
        let profile = PathProfile::new(curve);
        assert!(profile.total_km() > haversine_km(ORIGIN, to));
    }

    #[tokio::test]
    async fn test_acquire_retries_until_accepted() {
        let provider = FailingProvider {
            calls: AtomicU32::new(0),
            succeed_on: 4,
        };
        let config = RouteConfig::default();
        let route = acquire_route(&provider, ORIGIN, &config, || 0.5).await;
        assert!(!route.fallback);
        assert_eq!(route.attempts, 4);
        assert!((route.profile.total_km() - 50.0).abs() < 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_falls_back_to_stub() {
        let config = RouteConfig {
            max_attempts: 3,
            attempt_timeout: Duration::from_millis(100),
            ..RouteConfig::default()
        };
        let route = acquire_route(&HangingProvider, ORIGIN, &config, || 0.0).await;
        assert!(route.fallback);
        assert_eq!(route.attempts, 3);
        assert_eq!(route.profile.coords(), &[ORIGIN, ORIGIN.offset(0.2, 0.0)][..]);
    }

    #[test]
    fn test_draw_duration_is_clamped() {
        let config = RouteConfig::default();
        let stub = PathProfile::new(stub_path(ORIGIN, 0.001));
        assert_eq!(config.draw_duration(&stub), config.min_duration);

        let long = PathProfile::new(vec![ORIGIN, LngLat::new(10.0, 40.4)]);
        assert_eq!(config.draw_duration(&long), config.max_duration);
    }
}
