//! Contract Test: Event-Driven Reconciliation
//!
//! This test verifies that the runner reconciles what it is told about and
//! nothing else.
//!
//! Constraints verified:
//! - Running containers are reconciled once at startup
//! - Every start event is fed through the same reconciler
//! - A resync request repeats the full scan without restarting the stream
//! - A failed container listing is not fatal
//! - Start events without the routing marker cause no provider calls
//!
//! If this test fails, someone has broken the pipeline order or added
//! provider calls outside the reconciler.

mod common;

use common::*;
use dockdns_core::{ContainerObservation, ResyncReason, ResyncStatus, RetryPolicy, SyncRunner};
use std::sync::Arc;
use tokio::sync::oneshot;

#[tokio::test]
async fn initial_scan_reconciles_running_containers() {
    let provider = MockDnsProvider::new().with_existing("web.example.com");
    let (reconciler, stats) = reconciler_with(&provider, RetryPolicy::no_retry());
    let (source, _events_tx) = ControlledContainerSource::new(vec![
        routed_container("c1", "api.example.com"),
        routed_container("c2", "web.example.com"),
        plain_container("c3"),
    ]);

    let (runner, _resync) = SyncRunner::new(source.clone(), reconciler, 4);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(runner.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    wait_until(|| source.watch_call_count() == 1).await;

    assert_eq!(source.list_call_count(), 1);
    assert_eq!(provider.created_names(), vec!["api.example.com".to_string()]);
    let snap = stats.snapshot();
    assert_eq!(snap.containers_monitored, 2);
    assert_eq!(snap.dns_records_created, 1);

    shutdown_tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn start_event_creates_record() {
    let provider = MockDnsProvider::new();
    let (reconciler, stats) = reconciler_with(&provider, RetryPolicy::no_retry());
    let (source, events_tx) = ControlledContainerSource::new(Vec::new());

    let (runner, _resync) = SyncRunner::new(source.clone(), reconciler, 4);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(runner.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    events_tx
        .send(Ok(routed_container("c1", "api.example.com")))
        .unwrap();

    wait_until(|| provider.create_call_count() == 1).await;
    assert_eq!(provider.created_names(), vec!["api.example.com".to_string()]);
    assert_eq!(stats.snapshot().dns_records_created, 1);

    shutdown_tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn unrouted_start_event_is_ignored() {
    let provider = MockDnsProvider::new();
    let (reconciler, stats) = reconciler_with(&provider, RetryPolicy::no_retry());
    let (source, events_tx) = ControlledContainerSource::new(Vec::new());

    let (runner, _resync) = SyncRunner::new(source.clone(), reconciler, 4);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(runner.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    // Only attribute labels, no routing marker
    events_tx
        .send(Ok(ContainerObservation::new(
            "c1",
            "worker",
            vec![("image".to_string(), "busybox".to_string())],
        )))
        .unwrap();
    // A routed event after it proves the first one was consumed
    events_tx
        .send(Ok(routed_container("c2", "api.example.com")))
        .unwrap();

    wait_until(|| provider.create_call_count() == 1).await;
    assert_eq!(provider.exists_call_count(), 1, "only the routed event reached the provider");
    assert_eq!(stats.snapshot().containers_monitored, 1);

    shutdown_tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn resync_repeats_full_scan_without_restarting_stream() {
    let provider = MockDnsProvider::new();
    let (reconciler, _stats) = reconciler_with(&provider, RetryPolicy::no_retry());
    let (source, events_tx) = ControlledContainerSource::new(Vec::new());

    let (runner, resync) = SyncRunner::new(source.clone(), reconciler, 4);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(runner.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    wait_until(|| source.watch_call_count() == 1).await;
    assert_eq!(provider.create_call_count(), 0);

    // A container appeared while nobody was watching
    source.set_running(vec![routed_container("c1", "late.example.com")]);
    assert_eq!(resync.request(ResyncReason::Http), ResyncStatus::Queued);

    wait_until(|| provider.create_call_count() == 1).await;
    assert_eq!(source.list_call_count(), 2);
    assert_eq!(source.watch_call_count(), 1, "stream is not restarted");

    // The stream is still consumed after the resync
    events_tx
        .send(Ok(routed_container("c2", "api.example.com")))
        .unwrap();
    wait_until(|| provider.create_call_count() == 2).await;

    shutdown_tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn failed_listing_is_not_fatal() {
    let provider = MockDnsProvider::new();
    let (reconciler, _stats) = reconciler_with(&provider, RetryPolicy::no_retry());
    let (source, events_tx) = ControlledContainerSource::new(Vec::new());
    source.fail_list(true);

    let (runner, resync) = SyncRunner::new(source.clone(), reconciler, 4);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(runner.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    wait_until(|| source.watch_call_count() == 1).await;
    resync.request(ResyncReason::Signal);
    wait_until(|| source.list_call_count() == 2).await;

    events_tx
        .send(Ok(routed_container("c1", "api.example.com")))
        .unwrap();
    wait_until(|| provider.create_call_count() == 1).await;
    assert!(!handle.is_finished(), "runner keeps going after listing failures");

    shutdown_tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn scan_and_events_share_one_zone_lookup() {
    let provider = MockDnsProvider::new();
    let (reconciler, _stats) = reconciler_with(&provider, RetryPolicy::no_retry());
    let (source, events_tx) =
        ControlledContainerSource::new(vec![routed_container("c1", "api.example.com")]);

    let (runner, _resync) = SyncRunner::new(source.clone(), Arc::clone(&reconciler), 4);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(runner.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    events_tx
        .send(Ok(routed_container("c2", "web.example.com")))
        .unwrap();
    wait_until(|| provider.create_call_count() == 2).await;
    assert_eq!(provider.find_zone_call_count(), 1);

    shutdown_tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}
