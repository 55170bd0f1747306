//! Contract Test: Idempotent Reconciliation
//!
//! This test verifies that reconciliation never creates a record the
//! provider already has.
//!
//! Constraints verified:
//! - An existing record is never re-created, however many passes run
//! - Every pass checks existence fresh; nothing is cached locally
//! - A missing record is created exactly once
//! - Containers without a routing rule cause no provider calls
//!
//! If this test fails, someone has added:
//! - A local record inventory that bypasses the provider
//! - A create path that skips the existence check
//! - Provider calls for containers that opted out

mod common;

use common::*;
use dockdns_core::{Outcome, RetryPolicy, Subdomain};

#[tokio::test]
async fn existing_record_is_never_created() {
    let provider = MockDnsProvider::new().with_existing("api.example.com");
    let (reconciler, stats) = reconciler_with(&provider, RetryPolicy::default());
    let container = routed_container("c1", "api.example.com");

    for _ in 0..10 {
        let outcome = reconciler.reconcile(&container).await;
        assert_eq!(
            outcome,
            Outcome::Skipped {
                subdomain: Subdomain::Name("api".into())
            }
        );
    }

    assert_eq!(provider.create_call_count(), 0, "no create for existing record");
    assert_eq!(
        provider.exists_call_count(),
        10,
        "existence is checked fresh on every pass"
    );

    let snap = stats.snapshot();
    assert_eq!(snap.dns_records_created, 0);
    assert_eq!(snap.containers_monitored, 10);
    assert_eq!(snap.api_errors, 0);
}

#[tokio::test]
async fn missing_record_is_created_once() {
    let provider = MockDnsProvider::new();
    let (reconciler, stats) = reconciler_with(&provider, RetryPolicy::default());
    let container = routed_container("c1", "api.example.com");

    let outcome = reconciler.reconcile(&container).await;
    let expected = Subdomain::Name("api".into());
    assert!(
        matches!(outcome, Outcome::Created { ref subdomain, .. } if *subdomain == expected),
        "unexpected outcome: {:?}",
        outcome
    );
    assert_eq!(provider.create_call_count(), 1);
    assert_eq!(provider.created_names(), vec!["api.example.com".to_string()]);

    let record = &provider.created_records()[0];
    assert_eq!(record.ip, TARGET_IP);
    assert_eq!(record.ttl, 300);
    assert!(!record.proxied);
    assert_eq!(stats.snapshot().dns_records_created, 1);

    // Second pass sees the record the first one created
    let outcome = reconciler.reconcile(&container).await;
    assert!(matches!(outcome, Outcome::Skipped { .. }));
    assert_eq!(provider.create_call_count(), 1, "record created exactly once");
    assert_eq!(stats.snapshot().dns_records_created, 1);
}

#[tokio::test]
async fn apex_rule_creates_record_at_base_domain() {
    let provider = MockDnsProvider::new();
    let (reconciler, _stats) = reconciler_with(&provider, RetryPolicy::default());

    let outcome = reconciler
        .reconcile(&routed_container("c1", "example.com"))
        .await;

    assert!(matches!(
        outcome,
        Outcome::Created {
            subdomain: Subdomain::Apex,
            ..
        }
    ));
    assert_eq!(provider.created_names(), vec!["example.com".to_string()]);
}

#[tokio::test]
async fn unrouted_container_makes_no_provider_calls() {
    let provider = MockDnsProvider::new();
    let (reconciler, stats) = reconciler_with(&provider, RetryPolicy::default());

    assert_eq!(
        reconciler.reconcile(&plain_container("db")).await,
        Outcome::Ignored
    );

    // Routing rule present but routing not enabled
    let mut disabled = routed_container("c2", "api.example.com");
    disabled
        .labels
        .insert("traefik.enable".to_string(), "false".to_string());
    assert_eq!(reconciler.reconcile(&disabled).await, Outcome::Ignored);

    // Routed to a domain this instance does not manage
    assert_eq!(
        reconciler
            .reconcile(&routed_container("c3", "api.other.org"))
            .await,
        Outcome::Ignored
    );

    assert_eq!(provider.total_call_count(), 0, "no provider calls for ignored containers");
    let snap = stats.snapshot();
    assert_eq!(snap.containers_monitored, 0);
    assert_eq!(snap.dns_records_created, 0);
    assert_eq!(snap.api_errors, 0);
}

#[tokio::test]
async fn scan_creates_each_subdomain_once() {
    let provider = MockDnsProvider::new().with_existing("web.example.com");
    let (reconciler, stats) = reconciler_with(&provider, RetryPolicy::default());

    let scan = vec![
        routed_container("c1", "api.example.com"),
        routed_container("c2", "api.example.com"),
        routed_container("c3", "web.example.com"),
        plain_container("c4"),
    ];

    let summary = reconciler.reconcile_all(&scan).await;

    assert_eq!(summary.total, 4);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.ignored, 1);
    assert_eq!(summary.failed, 0);

    assert_eq!(provider.create_call_count(), 1);
    assert_eq!(
        provider.exists_call_count(),
        2,
        "duplicate subdomain in one scan does not reach the provider"
    );
    assert_eq!(stats.snapshot().containers_monitored, 3);
}
