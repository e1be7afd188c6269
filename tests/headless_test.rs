// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use reveal::config::{FeedMode, RevealConfig};
use reveal::headless::{HeadlessRunner, RunOutcome};
use reveal::ingestion::StaticUniverseSource;
use reveal::orchestrator::SimulatedRenderer;
use serde_json::json;
use tempfile::tempdir;

fn universe() -> Arc<StaticUniverseSource> {
    Arc::new(StaticUniverseSource::new(vec![
        json!({ "id": 10, "Nombre_placa": "Norte", "lat": 43.36, "lng": -8.41, "activo": true }),
        json!({ "id": 11, "Nombre_placa": "Sur", "lat": 36.72, "lng": -4.42 }),
        json!({ "id": 12, "Nombre_placa": "Este", "lat": 39.47, "lng": -0.38 }),
        json!({ "id": 13, "Nombre_placa": "Islas", "lat": 28.47, "lng": -16.25 }),
    ]))
}

fn seeded_config() -> RevealConfig {
    let mut config = RevealConfig::default();
    config.queue.seed = Some(1);
    config.polling.mock_seed = Some(2);
    config.polling.interval_ms = 10_000;
    config
}

#[tokio::test(start_paused = true)]
async fn test_campaign_runs_to_completion() {
    let dir = tempdir().unwrap();
    let views_path = dir.path().join("views.json");
    let mut config = seeded_config();
    config.views.snapshot_path = Some(views_path.clone());

    let renderer = Arc::new(SimulatedRenderer::new(0.0));
    let outcome = HeadlessRunner::new(config, renderer.clone(), renderer.clone())
        .with_source(universe())
        .run(std::future::pending::<()>())
        .await
        .unwrap();

    match outcome {
        RunOutcome::Completed(status) => {
            assert!(status.complete);
            assert_eq!((status.universe_size, status.active, status.painted), (4, 4, 4));
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(renderer.call_count() > 0);
    assert!(views_path.exists());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_the_run() {
    let mut config = seeded_config();
    config.polling.interval_ms = 3_600_000;

    let renderer = Arc::new(SimulatedRenderer::new(0.0));
    let outcome = HeadlessRunner::new(config, renderer.clone(), renderer)
        .with_source(universe())
        .run(tokio::time::sleep(Duration::from_secs(30)))
        .await
        .unwrap();

    match outcome {
        RunOutcome::Interrupted(status) => {
            assert!(!status.complete);
            assert_eq!(status.active, 1);
        }
        other => panic!("expected interruption, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_feed_follows_the_source() {
    let mut config = seeded_config();
    config.polling.feed = FeedMode::Snapshot;
    let rows = vec![
        json!({ "id": 1, "Nombre": "Uno", "lat": 40.0, "lng": -3.0, "activo": 1 }),
        json!({ "id": 2, "Nombre": "Dos", "lat": 41.0, "lng": -4.0, "activo": 0 }),
    ];

    // The snapshot never activates id 2, so only shutdown ends the run
    let renderer = Arc::new(SimulatedRenderer::new(0.0));
    let outcome = HeadlessRunner::new(config, renderer.clone(), renderer)
        .with_source(Arc::new(StaticUniverseSource::new(rows)))
        .run(tokio::time::sleep(Duration::from_secs(60)))
        .await
        .unwrap();

    assert_eq!(outcome.status().active, 1);
    assert!(matches!(outcome, RunOutcome::Interrupted(_)));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = seeded_config();
    config.polling.interval_ms = 0;

    let renderer = Arc::new(SimulatedRenderer::new(0.0));
    let err = HeadlessRunner::new(config, renderer.clone(), renderer)
        .with_source(universe())
        .run(std::future::pending::<()>())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("polling.interval_ms"));
}
