// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Renderer seam.

The orchestrator never draws anything itself. It drives a [`Renderer`] through
the pipeline stages and awaits each call under a stage timeout. The attract
overlay is a separate synchronous [`AttractOverlay`] so the idle controller does
not need an async runtime handle to toggle it.
*/

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reveal_structures::{CameraView, LngLat, PathProfile, Viewport, VisualSlot};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::RenderResult;
use crate::store::{PlacedRecord, RouteLayer};

/// Geographic renderer driven by the animation pipeline.
///
/// Every method resolves when the visual transition it starts has finished.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Multi-ring highlight at `at`; resolves when its animation completes
    async fn show_attention(&self, viewport: Viewport, at: LngLat) -> RenderResult<()>;

    async fn clear_attention(&self, viewport: Viewport) -> RenderResult<()>;

    /// Enlarge the inset footprint
    async fn expand(&self) -> RenderResult<()>;

    async fn collapse(&self) -> RenderResult<()>;

    async fn focus_camera(&self, viewport: Viewport, at: LngLat, zoom: f64) -> RenderResult<()>;

    async fn restore_camera(&self, viewport: Viewport, view: &CameraView) -> RenderResult<()>;

    /// Replace the drawn contents of one slot
    async fn place_record(
        &self,
        viewport: Viewport,
        slot: VisualSlot,
        records: &[PlacedRecord],
    ) -> RenderResult<()>;

    async fn show_caption(&self, viewport: Viewport, text: &str, at: LngLat) -> RenderResult<()>;

    async fn hide_caption(&self, viewport: Viewport) -> RenderResult<()>;

    /// Move a marker along `profile` over `duration`.
    ///
    /// The marker must advance by travelled distance, not by point index. After
    /// `t` of `duration` it sits at [`marker_position`] for that elapsed time.
    async fn draw_path(
        &self,
        viewport: Viewport,
        profile: &PathProfile,
        duration: Duration,
    ) -> RenderResult<()>;

    /// Replace the recorded routes and endpoints of one viewport
    async fn sync_routes(&self, viewport: Viewport, layer: &RouteLayer) -> RenderResult<()>;
}

/// Full-screen attract overlay toggled by the idle controller.
///
/// Called with no controller lock held, so an overlay may report activity back.
pub trait AttractOverlay: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Marker position `elapsed` into a `duration`-long walk of `profile`.
///
/// Speed is constant in kilometres, so short segments pass quickly and long ones
/// slowly. A zero duration puts the marker at the endpoint.
pub fn marker_position(profile: &PathProfile, elapsed: Duration, duration: Duration) -> Option<LngLat> {
    if duration.is_zero() {
        return profile.endpoint();
    }
    profile.point_at_fraction(elapsed.as_secs_f64() / duration.as_secs_f64())
}

/// Renderer that only logs and sleeps for representative transition times.
///
/// Used by the headless tool and for local runs without a map.
#[derive(Debug)]
pub struct SimulatedRenderer {
    time_scale: f64,
    calls: AtomicU64,
    attract_visible: AtomicBool,
    marker: Mutex<Option<LngLat>>,
}

impl Default for SimulatedRenderer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SimulatedRenderer {
    const ATTENTION: Duration = Duration::from_millis(1800);
    const EXPAND: Duration = Duration::from_millis(450);
    const FLIGHT: Duration = Duration::from_millis(1600);
    const FADE: Duration = Duration::from_millis(250);
    const FRAME: Duration = Duration::from_millis(16);
    const MAX_TIME_SCALE: f64 = 1000.0;

    /// `time_scale` multiplies every simulated duration; 0 makes calls instant.
    /// Values above 1000 are clamped.
    pub fn new(time_scale: f64) -> Self {
        let time_scale = if time_scale.is_finite() {
            time_scale.clamp(0.0, Self::MAX_TIME_SCALE)
        } else {
            1.0
        };
        Self {
            time_scale,
            calls: AtomicU64::new(0),
            attract_visible: AtomicBool::new(false),
            marker: Mutex::new(None),
        }
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn attract_visible(&self) -> bool {
        self.attract_visible.load(Ordering::Relaxed)
    }

    /// Last position reported by a path walk
    pub fn marker(&self) -> Option<LngLat> {
        *self.marker.lock()
    }

    fn scaled(&self, base: Duration) -> Duration {
        Duration::try_from_secs_f64(base.as_secs_f64() * self.time_scale).unwrap_or(Duration::MAX)
    }

    async fn simulate(&self, base: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let scaled = self.scaled(base);
        if !scaled.is_zero() {
            tokio::time::sleep(scaled).await;
        }
    }
}

#[async_trait]
impl Renderer for SimulatedRenderer {
    async fn show_attention(&self, viewport: Viewport, at: LngLat) -> RenderResult<()> {
        debug!(target: "reveal-orchestrator", "[SIM] {} attention at ({:.5}, {:.5})", viewport, at.lat, at.lng);
        self.simulate(Self::ATTENTION).await;
        Ok(())
    }

    async fn clear_attention(&self, viewport: Viewport) -> RenderResult<()> {
        debug!(target: "reveal-orchestrator", "[SIM] {} attention cleared", viewport);
        self.simulate(Duration::ZERO).await;
        Ok(())
    }

    async fn expand(&self) -> RenderResult<()> {
        debug!(target: "reveal-orchestrator", "[SIM] inset expanded");
        self.simulate(Self::EXPAND).await;
        Ok(())
    }

    async fn collapse(&self) -> RenderResult<()> {
        debug!(target: "reveal-orchestrator", "[SIM] inset collapsed");
        self.simulate(Self::EXPAND).await;
        Ok(())
    }

    async fn focus_camera(&self, viewport: Viewport, at: LngLat, zoom: f64) -> RenderResult<()> {
        debug!(
            target: "reveal-orchestrator",
            "[SIM] {} camera -> ({:.5}, {:.5}) z{:.1}",
            viewport, at.lat, at.lng, zoom
        );
        self.simulate(Self::FLIGHT).await;
        Ok(())
    }

    async fn restore_camera(&self, viewport: Viewport, view: &CameraView) -> RenderResult<()> {
        debug!(target: "reveal-orchestrator", "[SIM] {} camera restored to z{:.2}", viewport, view.zoom);
        self.simulate(Self::FLIGHT).await;
        Ok(())
    }

    async fn place_record(
        &self,
        viewport: Viewport,
        slot: VisualSlot,
        records: &[PlacedRecord],
    ) -> RenderResult<()> {
        info!(
            target: "reveal-orchestrator",
            "[SIM] {} {} ({}) now shows {} record(s)",
            viewport,
            slot,
            slot.variant().name,
            records.len()
        );
        self.simulate(Duration::ZERO).await;
        Ok(())
    }

    async fn show_caption(&self, viewport: Viewport, text: &str, _at: LngLat) -> RenderResult<()> {
        info!(target: "reveal-orchestrator", "[SIM] {} caption: {}", viewport, text);
        self.simulate(Self::FADE).await;
        Ok(())
    }

    async fn hide_caption(&self, viewport: Viewport) -> RenderResult<()> {
        debug!(target: "reveal-orchestrator", "[SIM] {} caption hidden", viewport);
        self.simulate(Self::FADE).await;
        Ok(())
    }

    async fn draw_path(
        &self,
        viewport: Viewport,
        profile: &PathProfile,
        duration: Duration,
    ) -> RenderResult<()> {
        debug!(
            target: "reveal-orchestrator",
            "[SIM] {} path of {} points ({:.1} km) over {:?}",
            viewport,
            profile.coords().len(),
            profile.total_km(),
            duration
        );
        self.calls.fetch_add(1, Ordering::Relaxed);
        let scaled = self.scaled(duration);
        let start = Instant::now();
        loop {
            let elapsed = start.elapsed().min(scaled);
            *self.marker.lock() = marker_position(profile, elapsed, scaled);
            if elapsed >= scaled {
                break;
            }
            tokio::time::sleep(Self::FRAME.min(scaled - elapsed)).await;
        }
        Ok(())
    }

    async fn sync_routes(&self, viewport: Viewport, layer: &RouteLayer) -> RenderResult<()> {
        debug!(
            target: "reveal-orchestrator",
            "[SIM] {} routes synced: {} path(s), {} endpoint(s)",
            viewport,
            layer.routes.len(),
            layer.endpoints.len()
        );
        self.simulate(Duration::ZERO).await;
        Ok(())
    }
}

impl AttractOverlay for SimulatedRenderer {
    fn show(&self) {
        info!(target: "reveal-orchestrator", "[SIM] attract overlay shown");
        self.attract_visible.store(true, Ordering::Relaxed);
    }

    fn hide(&self) {
        debug!(target: "reveal-orchestrator", "[SIM] attract overlay hidden");
        self.attract_visible.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_focus_takes_flight_time() {
        let renderer = SimulatedRenderer::new(1.0);
        let start = tokio::time::Instant::now();
        renderer
            .focus_camera(Viewport::Main, LngLat::new(-3.7, 40.4), 7.8)
            .await
            .unwrap();
        assert_eq!(start.elapsed(), SimulatedRenderer::FLIGHT);
        assert_eq!(renderer.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_scale_is_instant() {
        let renderer = SimulatedRenderer::new(0.0);
        let start = tokio::time::Instant::now();
        renderer.expand().await.unwrap();
        renderer
            .show_attention(Viewport::Inset, LngLat::new(-15.4, 28.1))
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_huge_time_scale_is_clamped() {
        let renderer = SimulatedRenderer::new(1e20);
        assert_eq!(renderer.time_scale(), SimulatedRenderer::MAX_TIME_SCALE);
        assert_eq!(
            renderer.scaled(SimulatedRenderer::FLIGHT),
            SimulatedRenderer::FLIGHT.mul_f64(SimulatedRenderer::MAX_TIME_SCALE)
        );
        assert_eq!(SimulatedRenderer::new(f64::INFINITY).time_scale(), 1.0);
        assert_eq!(SimulatedRenderer::new(-3.0).time_scale(), 0.0);
        // Never panics even for durations near the representable limit
        assert_eq!(renderer.scaled(Duration::MAX), Duration::MAX);
    }

    fn uneven_path() -> PathProfile {
        // ~1 km first leg, ~110 km second leg along the equator
        PathProfile::new(vec![
            LngLat::new(0.0, 0.0),
            LngLat::new(0.01, 0.0),
            LngLat::new(1.0, 0.0),
        ])
    }

    #[test]
    fn test_marker_position_follows_distance() {
        let profile = uneven_path();
        let duration = Duration::from_secs(10);

        // Halfway in time is halfway in kilometres, well past the short first leg
        let half = marker_position(&profile, Duration::from_secs(5), duration).unwrap();
        assert!((half.lng - 0.5).abs() < 1e-3, "marker at {half:?}");

        let early = marker_position(&profile, Duration::from_millis(100), duration).unwrap();
        assert!(early.lng < 0.02, "marker at {early:?}");

        assert_eq!(
            marker_position(&profile, duration, duration),
            profile.endpoint()
        );
        assert_eq!(
            marker_position(&profile, Duration::ZERO, Duration::ZERO),
            profile.endpoint()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_path_walk_moves_by_distance() {
        let renderer = std::sync::Arc::new(SimulatedRenderer::new(1.0));
        let walker = renderer.clone();
        let task = tokio::spawn(async move {
            walker
                .draw_path(Viewport::Main, &uneven_path(), Duration::from_secs(1))
                .await
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        let mid = renderer.marker().unwrap();
        assert!((0.45..=0.55).contains(&mid.lng), "marker at {mid:?}");

        task.await.unwrap().unwrap();
        assert_eq!(renderer.marker(), Some(LngLat::new(1.0, 0.0)));
    }

    #[test]
    fn test_attract_overlay_toggles() {
        let renderer = SimulatedRenderer::default();
        renderer.show();
        assert!(renderer.attract_visible());
        renderer.hide();
        assert!(!renderer.attract_visible());
    }
}
