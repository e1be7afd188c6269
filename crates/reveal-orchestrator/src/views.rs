// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-viewport restore targets, replaceable at runtime and snapshot to JSON

use std::path::Path;

use reveal_structures::{CameraView, Viewport};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::OrchestratorResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewDefaults {
    pub main: CameraView,
    pub inset: CameraView,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            main: CameraView::default_for(Viewport::Main),
            inset: CameraView::default_for(Viewport::Inset),
        }
    }
}

impl ViewDefaults {
    /// Stored view, or the built-in one if the stored view is unusable
    pub fn get(&self, viewport: Viewport) -> CameraView {
        match viewport {
            Viewport::Main => self.main,
            Viewport::Inset => self.inset,
        }
        .or_default_for(viewport)
    }

    /// Returns false and keeps the old view if `view` is not finite
    pub fn set(&mut self, viewport: Viewport, view: CameraView) -> bool {
        if !view.is_valid() {
            warn!(target: "reveal-orchestrator", "Ignoring non-finite default view for {}", viewport);
            return false;
        }
        match viewport {
            Viewport::Main => self.main = view,
            Viewport::Inset => self.inset = view,
        }
        true
    }

    pub fn save(&self, path: &Path) -> OrchestratorResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(target: "reveal-orchestrator", "Saved default views to {}", path.display());
        Ok(())
    }

    /// Invalid entries in the file fall back to the built-in defaults
    pub fn load(path: &Path) -> OrchestratorResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let loaded: ViewDefaults = serde_json::from_str(&text)?;
        Ok(Self {
            main: loaded.main.or_default_for(Viewport::Main),
            inset: loaded.inset.or_default_for(Viewport::Inset),
        })
    }
}
