// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Campaign bootstrap, polling and completion against a live orchestrator.

use std::sync::Arc;
use std::time::Duration;

use reveal_ingestion::{
    CampaignDriver, MockBatchConfig, MockBatchGenerator, ScriptedFeed, StaticUniverseSource,
};
use reveal_orchestrator::{
    IdleState, Orchestrator, OrchestratorConfig, OrchestratorEvent, SimulatedRenderer,
};
use reveal_structures::RecordOrigin;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;

fn five_record_universe() -> Vec<Value> {
    vec![
        json!({ "id": 1, "Nombre_placa": "Uno", "lat": 40.41, "lng": -3.70, "activo": true }),
        json!({ "id": 2, "Nombre_placa": "Dos", "lat": 28.10, "lng": -15.44, "activo": "1" }),
        json!({ "id": 3, "Nombre_placa": "Tres", "lat": 41.39, "lng": 2.17, "activo": false }),
        json!({ "id": 4, "Nombre_placa": "Cuatro", "lat": 37.39, "lng": -5.98, "activo": 0 }),
        json!({ "id": 5, "Nombre_placa": "Cinco", "lat": 43.26, "lng": -2.93 }),
    ]
}

fn orchestrator() -> Orchestrator {
    let renderer = Arc::new(SimulatedRenderer::new(0.0));
    let config = OrchestratorConfig {
        seed: Some(9),
        ..OrchestratorConfig::default()
    };
    Orchestrator::new(config, renderer.clone(), renderer)
}

async fn until(rx: &mut Receiver<OrchestratorEvent>, target: &OrchestratorEvent) -> Vec<OrchestratorEvent> {
    let mut seen = Vec::new();
    loop {
        let event = rx.recv().await.expect("event stream open");
        let done = &event == target;
        seen.push(event);
        if done {
            return seen;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_five_record_campaign_completes_once() {
    let orch = orchestrator();
    let mut rx = orch.subscribe();
    let driver = CampaignDriver::new(orch.clone()).unwrap();

    let report = driver
        .bootstrap(&StaticUniverseSource::new(five_record_universe()))
        .await
        .unwrap();
    assert_eq!(report.universe_size, 5);
    assert_eq!(report.active_ids.len(), 2);
    assert_eq!(orch.visible_count(), 2);

    match rx.recv().await.unwrap() {
        OrchestratorEvent::ActiveLoaded { count, ids } => {
            assert_eq!(count, 2);
            assert_eq!(ids, report.active_ids);
        }
        other => panic!("expected ActiveLoaded, got {other:?}"),
    }

    let feed = MockBatchGenerator::new(MockBatchConfig {
        counts: vec![1],
        pool: vec![2, 4],
        seed: Some(17),
    });
    let poller = driver.poll(Duration::from_secs(60), Box::new(feed)).unwrap();

    let events = until(&mut rx, &OrchestratorEvent::CampaignComplete).await;
    poller.await.unwrap();

    let painted: Vec<_> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, OrchestratorEvent::Painted { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(painted.len(), 3);
    assert!(events.contains(&OrchestratorEvent::AllActive { universe_size: 5 }));
    assert_eq!(events.last(), Some(&OrchestratorEvent::CampaignComplete));
    assert!(painted.iter().all(|i| *i < events.len() - 1));

    // Nothing else completes the campaign a second time
    tokio::time::sleep(Duration::from_secs(600)).await;
    loop {
        match rx.try_recv() {
            Ok(OrchestratorEvent::CampaignComplete) => panic!("campaign completed twice"),
            Ok(_) => continue,
            Err(TryRecvError::Empty) => break,
            Err(e) => panic!("unexpected {e:?}"),
        }
    }

    assert!(driver.is_complete());
    assert_eq!(orch.idle_state(), IdleState::Disabled);
    let status = driver.status();
    assert_eq!((status.active, status.painted, status.universe_size), (5, 5, 5));
}

#[tokio::test(start_paused = true)]
async fn test_polling_stops_once_all_active() {
    let orch = orchestrator();
    let mut rx = orch.subscribe();
    let driver = CampaignDriver::new(orch.clone()).unwrap();
    driver
        .bootstrap(&StaticUniverseSource::new(five_record_universe()))
        .await
        .unwrap();

    // Unknown and repeated ids are ignored
    let feed = ScriptedFeed::new([vec![3, 99], vec![3], vec![4, 5]]);
    let poller = driver.poll(Duration::from_secs(5), Box::new(feed)).unwrap();

    until(&mut rx, &OrchestratorEvent::AllActive { universe_size: 5 }).await;
    tokio::time::timeout(Duration::from_secs(1), poller)
        .await
        .expect("poller exits after AllActive")
        .unwrap();
    assert!(driver.status().all_active);
}

#[tokio::test(start_paused = true)]
async fn test_manual_activation_uses_manual_origin() {
    let orch = orchestrator();
    let mut rx = orch.subscribe();
    let driver = CampaignDriver::new(orch.clone()).unwrap();
    driver
        .bootstrap(&StaticUniverseSource::new(five_record_universe()))
        .await
        .unwrap();

    assert!(driver.activate(3, RecordOrigin::Manual).is_some());
    assert!(driver.activate(3, RecordOrigin::Manual).is_none());
    assert!(driver.activate(42, RecordOrigin::Manual).is_none());

    let events = until(&mut rx, &OrchestratorEvent::QueueDrained).await;
    let origins: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            OrchestratorEvent::Painted { origin, .. } => Some(*origin),
            _ => None,
        })
        .collect();
    assert_eq!(origins, vec![RecordOrigin::Manual]);
    assert!(!driver.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_fully_active_universe_completes_at_bootstrap() {
    let orch = orchestrator();
    let mut rx = orch.subscribe();
    let driver = CampaignDriver::new(orch.clone()).unwrap();
    let rows = vec![
        json!({ "id": 1, "Nombre": "A", "lat": 40.0, "lng": -3.0, "activo": true }),
        json!({ "id": 2, "Nombre": "B", "lat": 41.0, "lng": -4.0, "activo": "true" }),
    ];
    driver.bootstrap(&StaticUniverseSource::new(rows)).await.unwrap();

    until(&mut rx, &OrchestratorEvent::CampaignComplete).await;
    assert_eq!(orch.idle_state(), IdleState::Disabled);
}

#[tokio::test(start_paused = true)]
async fn test_empty_universe_never_completes() {
    let orch = orchestrator();
    let driver = CampaignDriver::new(orch.clone()).unwrap();
    let report = driver
        .bootstrap(&StaticUniverseSource::new(vec![json!({ "id": 1, "lat": null, "lng": 1.0 })]))
        .await
        .unwrap();
    assert_eq!(report.universe_size, 0);
    assert_eq!(report.dropped_rows, 1);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!driver.is_complete());
    assert_ne!(orch.idle_state(), IdleState::Disabled);
}

#[tokio::test(start_paused = true)]
async fn test_poll_before_bootstrap_waits_for_a_universe() {
    let orch = orchestrator();
    let mut rx = orch.subscribe();
    let driver = CampaignDriver::new(orch.clone()).unwrap();

    let feed = ScriptedFeed::new([vec![1], vec![2]]);
    let poller = driver.poll(Duration::from_secs(1), Box::new(feed)).unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(!poller.is_finished());
    assert!(!driver.status().all_active);
    loop {
        match rx.try_recv() {
            Ok(OrchestratorEvent::AllActive { universe_size }) => {
                panic!("AllActive announced for a universe of {universe_size}")
            }
            Ok(_) => {}
            Err(TryRecvError::Empty) => break,
            Err(e) => panic!("event stream failed: {e}"),
        }
    }
    poller.abort();
}
