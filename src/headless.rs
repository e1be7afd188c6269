// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end campaign run: bootstrap, poll, and wait for completion or shutdown.

use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use reveal_config::{validate_config, RevealConfig};
use reveal_ingestion::{CampaignDriver, CampaignStatus, JsonFileUniverseSource, UniverseSource};
use reveal_orchestrator::{AttractOverlay, Orchestrator, OrchestratorEvent, Renderer};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::settings::{activation_feed, orchestrator_config};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every record active and painted
    Completed(CampaignStatus),
    /// Shutdown requested first
    Interrupted(CampaignStatus),
}

impl RunOutcome {
    pub fn status(&self) -> CampaignStatus {
        match self {
            Self::Completed(status) | Self::Interrupted(status) => *status,
        }
    }
}

pub struct HeadlessRunner {
    config: RevealConfig,
    renderer: Arc<dyn Renderer>,
    overlay: Arc<dyn AttractOverlay>,
    source: Option<Arc<dyn UniverseSource>>,
}

impl HeadlessRunner {
    pub fn new(
        config: RevealConfig,
        renderer: Arc<dyn Renderer>,
        overlay: Arc<dyn AttractOverlay>,
    ) -> Self {
        Self {
            config,
            renderer,
            overlay,
            source: None,
        }
    }

    /// Replace the universe file named in the config
    pub fn with_source(mut self, source: Arc<dyn UniverseSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Run the campaign until it completes or `shutdown` resolves.
    ///
    /// Default views are loaded from the configured snapshot at start and saved
    /// back on exit.
    pub async fn run<F>(self, shutdown: F) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let config = self.config;
        validate_config(&config)?;

        let orchestrator = Orchestrator::new(orchestrator_config(&config), self.renderer, self.overlay);
        if let Some(path) = config.views.snapshot_path.as_deref().filter(|p| p.exists()) {
            match orchestrator.load_views(path) {
                Ok(()) => info!(target: "reveal", "Default views loaded from {}", path.display()),
                Err(e) => warn!(target: "reveal", "Ignoring view snapshot {}: {}", path.display(), e),
            }
        }

        let mut events = orchestrator.subscribe();
        let driver = CampaignDriver::new(orchestrator.clone())?;
        let source: Arc<dyn UniverseSource> = match self.source {
            Some(source) => source,
            None => Arc::new(JsonFileUniverseSource::new(&config.data.universe_path)),
        };

        let report = driver
            .bootstrap(&*source)
            .await
            .with_context(|| format!("Bootstrap from {} failed", source.describe()))?;
        info!(
            target: "reveal",
            "Campaign of {} record(s), {} already on the map",
            report.universe_size,
            report.active_ids.len()
        );

        let poller = driver.poll(config.polling.interval(), activation_feed(&config, Arc::clone(&source)))?;

        tokio::pin!(shutdown);
        let outcome = loop {
            if driver.is_complete() {
                break RunOutcome::Completed(driver.status());
            }
            tokio::select! {
                event = events.recv() => match event {
                    Ok(OrchestratorEvent::CampaignComplete) => break RunOutcome::Completed(driver.status()),
                    Ok(OrchestratorEvent::PipelineFailed { stable_id, stage, error }) => {
                        warn!(target: "reveal", "Record {} failed at {}: {}", stable_id, stage, error);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(target: "reveal", "Runner missed {} event(s)", missed);
                    }
                    Err(RecvError::Closed) => {
                        poller.abort();
                        bail!("Orchestrator event stream closed");
                    }
                },
                _ = &mut shutdown => break RunOutcome::Interrupted(driver.status()),
            }
        };
        poller.abort();

        if let Some(path) = config.views.snapshot_path.as_deref() {
            if let Err(e) = orchestrator.save_views(path) {
                warn!(target: "reveal", "Could not save default views to {}: {}", path.display(), e);
            }
        }

        let status = outcome.status();
        info!(
            target: "reveal",
            "Run finished: {}/{} active, {} painted{}",
            status.active,
            status.universe_size,
            status.painted,
            if status.complete { ", complete" } else { "" }
        );
        Ok(outcome)
    }
}
