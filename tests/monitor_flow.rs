//! End-to-end monitoring scenarios: failure injection, breaker lifecycle,
//! and alert reconciliation, driven through the scheduler's tick entrypoint.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use storage_sentinel::alerts::{AlertStatus, AlertType};
use storage_sentinel::breaker::CircuitState;
use storage_sentinel::config::MonitorConfig;
use storage_sentinel::error::ErrorKind;
use storage_sentinel::probe::ProbeOperation;
use storage_sentinel::store::StateStore;

use common::{harness, RESOURCE};

fn write_only(config: MonitorConfig) -> MonitorConfig {
    MonitorConfig {
        probed_operations: vec![ProbeOperation::Write],
        ..config
    }
}

#[tokio::test]
async fn breaker_opens_then_recovers_with_single_alert_cycle() {
    let harness = harness(write_only(MonitorConfig {
        failure_threshold: 3,
        recovery_timeout_ms: 150,
        metrics_window_ms: 150,
        ..MonitorConfig::default()
    }))
    .await;

    // Three consecutive write failures open the circuit.
    harness.backend.set_failing(true);
    for _ in 0..3 {
        harness.tick().await;
    }
    assert_eq!(
        harness.breaker.status().await.unwrap().state,
        CircuitState::Open
    );
    let open = harness.store.open_alerts(RESOURCE).await.unwrap();
    assert!(open
        .iter()
        .any(|a| a.alert_type == AlertType::CircuitOpen));

    // Re-evaluating the same failing condition must not duplicate alerts.
    harness.tick().await;
    let all = harness.store.list_alerts(RESOURCE, true, 100).await.unwrap();
    assert_eq!(
        all.iter()
            .filter(|a| a.alert_type == AlertType::CircuitOpen)
            .count(),
        1
    );

    // Let the recovery timeout elapse and the failures age out of the
    // metrics window, then recover the backend.
    harness.backend.set_failing(false);
    tokio::time::sleep(Duration::from_millis(250)).await;
    harness.tick().await;

    let status = harness.breaker.status().await.unwrap();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.consecutive_failures, 0);

    assert!(harness.store.open_alerts(RESOURCE).await.unwrap().is_empty());
    let all = harness.store.list_alerts(RESOURCE, true, 100).await.unwrap();
    let circuit_open: Vec<_> = all
        .iter()
        .filter(|a| a.alert_type == AlertType::CircuitOpen)
        .collect();
    assert_eq!(circuit_open.len(), 1);
    assert_eq!(circuit_open[0].status, AlertStatus::Resolved);
    assert!(circuit_open[0].resolved_at_ms.is_some());

    // service_recovered fires exactly once, even across further healthy ticks.
    harness.tick().await;
    let recovered = harness
        .store
        .list_alerts(RESOURCE, true, 100)
        .await
        .unwrap()
        .iter()
        .filter(|a| a.alert_type == AlertType::ServiceRecovered)
        .count();
    assert_eq!(recovered, 1);
}

#[tokio::test]
async fn success_resets_streak_below_threshold() {
    let harness = harness(write_only(MonitorConfig {
        failure_threshold: 5,
        ..MonitorConfig::default()
    }))
    .await;

    harness.backend.set_failing(true);
    for _ in 0..4 {
        harness.tick().await;
    }
    harness.backend.set_failing(false);
    harness.tick().await;

    let status = harness.breaker.status().await.unwrap();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.consecutive_failures, 0);

    // The breaker never opened, so no circuit_open alert ever existed.
    let all = harness.store.list_alerts(RESOURCE, true, 100).await.unwrap();
    assert!(all.iter().all(|a| a.alert_type != AlertType::CircuitOpen));
}

#[tokio::test]
async fn open_circuit_rejects_probes_without_calling_backend() {
    let harness = harness(write_only(MonitorConfig {
        failure_threshold: 1,
        recovery_timeout_ms: 3_600_000,
        ..MonitorConfig::default()
    }))
    .await;

    harness.backend.set_failing(true);
    harness.tick().await;
    let calls_after_open = harness.backend.invocations.load(Ordering::SeqCst);
    assert_eq!(
        harness.breaker.status().await.unwrap().state,
        CircuitState::Open
    );

    harness.tick().await;
    assert_eq!(
        harness.backend.invocations.load(Ordering::SeqCst),
        calls_after_open,
        "rejected probes must never reach the backend"
    );

    let latest = &harness.store.recent_results(1, 0).await.unwrap()[0];
    assert!(!latest.success);
    assert_eq!(latest.error_kind, Some(ErrorKind::CircuitOpen));
}

#[tokio::test]
async fn scheduler_loop_produces_results_and_snapshot() {
    let harness = harness(MonitorConfig {
        check_interval_ms: 50,
        ..MonitorConfig::default()
    })
    .await;

    let shutdown = harness.spawn_scheduler();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let _ = shutdown.send(());

    let results = harness.store.recent_results(100, 0).await.unwrap();
    assert!(!results.is_empty(), "scheduler should have produced probes");
    assert!(results.iter().all(|r| r.success));

    let snapshot = harness.latest_metrics.load_full().expect("snapshot published");
    assert!(snapshot.total_calls > 0);
    assert_eq!(snapshot.failed_calls, 0);
}

#[tokio::test]
async fn disabled_monitoring_produces_no_probes() {
    let harness = harness(MonitorConfig {
        enabled: false,
        check_interval_ms: 20,
        ..MonitorConfig::default()
    })
    .await;

    let shutdown = harness.spawn_scheduler();
    tokio::time::sleep(Duration::from_millis(150)).await;
    let _ = shutdown.send(());

    assert!(harness.store.recent_results(10, 0).await.unwrap().is_empty());
    assert_eq!(harness.backend.invocations.load(Ordering::SeqCst), 0);
}
