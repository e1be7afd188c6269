// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # reveal-structures
//!
//! The most core library of the reveal workspace. Defines the data types every other
//! crate speaks in:
//!
//! - [`LngLat`] and the spherical helpers in [`geo`] (haversine, bearing/distance
//!   projection, constant-speed path profiles)
//! - [`Record`], its [`StableId`] and the [`RecordOrigin`] tag carried by painted events
//! - [`Viewport`] routing through the fixed inset [`Geofence`], and per-viewport
//!   [`CameraView`] defaults
//! - [`VisualSlot`], the parallel placement channels with their pulse variants
//!
//! Nothing in here performs I/O or spawns tasks.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod geo;
pub mod record;
pub mod slot;
pub mod viewport;

pub use error::{RecordError, RecordResult};
pub use geo::{LngLat, PathProfile, EARTH_RADIUS_KM};
pub use record::{Record, RecordOrigin, StableId};
pub use slot::{SlotVariant, VisualSlot, SLOT_COUNT, SLOT_VARIANTS};
pub use viewport::{route, CameraView, Geofence, Viewport, INSET_GEOFENCE};
