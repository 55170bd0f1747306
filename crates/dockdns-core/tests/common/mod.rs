//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that verify behavioral
//! contracts without talking to a real container runtime or DNS provider.

#![allow(dead_code)]

use dockdns_core::error::{Error, Result};
use dockdns_core::traits::{ContainerEventStream, ContainerSource, DnsProvider, RecordMetadata};
use dockdns_core::{
    ContainerObservation, DesiredRecord, DnsClient, RecordOptions, ReconciliationStats, Reconciler,
    RetryPolicy, Zone,
};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const BASE_DOMAIN: &str = "example.com";
pub const ZONE_ID: &str = "zone-123";
pub const TARGET_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 10);

/// Labels of a container routed to `host`
pub fn routed_labels(host: &str) -> Vec<(String, String)> {
    vec![
        ("traefik.enable".to_string(), "true".to_string()),
        (
            "traefik.http.routers.app.rule".to_string(),
            format!("Host(`{}`)", host),
        ),
    ]
}

/// A container routed to `host`
pub fn routed_container(id: &str, host: &str) -> ContainerObservation {
    ContainerObservation::new(id, format!("{}-name", id), routed_labels(host))
}

/// A container with no proxy labels at all
pub fn plain_container(id: &str) -> ContainerObservation {
    ContainerObservation::new(
        id,
        format!("{}-name", id),
        vec![("com.example.role".to_string(), "db".to_string())],
    )
}

/// A container source fed by the test
///
/// `list_running()` returns whatever was last set with [`set_running`];
/// `watch_starts()` yields what the test sends through the returned sender.
/// Dropping the sender ends the stream.
///
/// [`set_running`]: ControlledContainerSource::set_running
pub struct ControlledContainerSource {
    running: Mutex<Vec<ContainerObservation>>,
    fail_list: AtomicBool,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<Result<ContainerObservation>>>>,
    list_call_count: AtomicUsize,
    watch_call_count: AtomicUsize,
}

impl ControlledContainerSource {
    pub fn new(
        running: Vec<ContainerObservation>,
    ) -> (
        Arc<Self>,
        mpsc::UnboundedSender<Result<ContainerObservation>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            running: Mutex::new(running),
            fail_list: AtomicBool::new(false),
            events_rx: Mutex::new(Some(rx)),
            list_call_count: AtomicUsize::new(0),
            watch_call_count: AtomicUsize::new(0),
        });
        (source, tx)
    }

    /// Replace the set of running containers
    pub fn set_running(&self, running: Vec<ContainerObservation>) {
        *self.running.lock().unwrap() = running;
    }

    /// Make `list_running()` fail
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Get the number of times list_running() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times watch_starts() was called
    pub fn watch_call_count(&self) -> usize {
        self.watch_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ContainerSource for ControlledContainerSource {
    async fn list_running(&self) -> Result<Vec<ContainerObservation>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Error::container_runtime("daemon unavailable"));
        }
        Ok(self.running.lock().unwrap().clone())
    }

    fn watch_starts(&self) -> ContainerEventStream {
        self.watch_call_count.fetch_add(1, Ordering::SeqCst);

        // Take the receiver (only called once)
        let rx = self
            .events_rx
            .lock()
            .unwrap()
            .take()
            .expect("watch_starts() can only be called once");

        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }

    fn source_name(&self) -> &'static str {
        "controlled"
    }
}

/// A scripted DnsProvider that tracks calls
///
/// Records named in `existing` are reported present; successful creates are
/// added to it. Failures are scripted per operation.
pub struct MockDnsProvider {
    existing: Mutex<HashSet<String>>,
    created: Mutex<Vec<DesiredRecord>>,
    created_names: Mutex<Vec<String>>,
    zone_missing: AtomicBool,
    exists_fails: AtomicBool,
    create_failures_remaining: AtomicUsize,
    find_zone_call_count: AtomicUsize,
    exists_call_count: AtomicUsize,
    create_call_count: AtomicUsize,
}

impl MockDnsProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            existing: Mutex::new(HashSet::new()),
            created: Mutex::new(Vec::new()),
            created_names: Mutex::new(Vec::new()),
            zone_missing: AtomicBool::new(false),
            exists_fails: AtomicBool::new(false),
            create_failures_remaining: AtomicUsize::new(0),
            find_zone_call_count: AtomicUsize::new(0),
            exists_call_count: AtomicUsize::new(0),
            create_call_count: AtomicUsize::new(0),
        })
    }

    /// Mark an FQDN as already present at the provider
    pub fn with_existing(self: Arc<Self>, fqdn: &str) -> Arc<Self> {
        self.existing.lock().unwrap().insert(fqdn.to_string());
        self
    }

    /// Fail the next `n` create calls
    pub fn fail_creates(&self, n: usize) {
        self.create_failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Make every existence check fail
    pub fn fail_exists(&self, fail: bool) {
        self.exists_fails.store(fail, Ordering::SeqCst);
    }

    /// Report no zone for any domain
    pub fn zone_missing(&self, missing: bool) {
        self.zone_missing.store(missing, Ordering::SeqCst);
    }

    /// Get the number of times find_zone() was called
    pub fn find_zone_call_count(&self) -> usize {
        self.find_zone_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times a_record_exists() was called
    pub fn exists_call_count(&self) -> usize {
        self.exists_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times create_a_record() was called
    pub fn create_call_count(&self) -> usize {
        self.create_call_count.load(Ordering::SeqCst)
    }

    /// FQDNs of successfully created records, in order
    pub fn created_names(&self) -> Vec<String> {
        self.created_names.lock().unwrap().clone()
    }

    /// Successfully created records, in order
    pub fn created_records(&self) -> Vec<DesiredRecord> {
        self.created.lock().unwrap().clone()
    }

    /// Total provider calls of any kind
    pub fn total_call_count(&self) -> usize {
        self.find_zone_call_count() + self.exists_call_count() + self.create_call_count()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_zone(&self, domain: &str) -> Result<Zone> {
        self.find_zone_call_count.fetch_add(1, Ordering::SeqCst);
        if self.zone_missing.load(Ordering::SeqCst) {
            return Err(Error::zone_not_found(domain));
        }
        Ok(Zone {
            name: domain.to_string(),
            id: ZONE_ID.to_string(),
        })
    }

    async fn a_record_exists(&self, zone: &Zone, fqdn: &str) -> Result<bool> {
        self.exists_call_count.fetch_add(1, Ordering::SeqCst);
        assert_eq!(zone.id, ZONE_ID);
        if self.exists_fails.load(Ordering::SeqCst) {
            return Err(Error::provider("mock", "lookup failed"));
        }
        Ok(self.existing.lock().unwrap().contains(fqdn))
    }

    async fn create_a_record(
        &self,
        zone: &Zone,
        fqdn: &str,
        record: &DesiredRecord,
    ) -> Result<RecordMetadata> {
        let call = self.create_call_count.fetch_add(1, Ordering::SeqCst) + 1;
        assert_eq!(zone.id, ZONE_ID);

        let remaining = self.create_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.create_failures_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(Error::provider("mock", format!("create failed (call {})", call)));
        }

        self.existing.lock().unwrap().insert(fqdn.to_string());
        self.created_names.lock().unwrap().push(fqdn.to_string());
        self.created.lock().unwrap().push(record.clone());

        Ok(RecordMetadata {
            id: format!("rec-{}", call),
            name: fqdn.to_string(),
            content: record.ip.to_string(),
            ttl: Some(record.ttl),
            proxied: record.proxied,
        })
    }

    async fn list_a_records(&self, _zone: &Zone) -> Result<Vec<RecordMetadata>> {
        Ok(self
            .existing
            .lock()
            .unwrap()
            .iter()
            .map(|name| RecordMetadata {
                id: format!("id-{}", name),
                name: name.clone(),
                content: TARGET_IP.to_string(),
                ttl: Some(300),
                proxied: false,
            })
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to build a reconciler over a mock provider
pub fn reconciler_with(
    provider: &Arc<MockDnsProvider>,
    retry: RetryPolicy,
) -> (Arc<Reconciler>, Arc<ReconciliationStats>) {
    let stats = Arc::new(ReconciliationStats::new());
    let client = DnsClient::new(
        Arc::clone(provider) as Arc<dyn DnsProvider>,
        BASE_DOMAIN,
        retry,
    );
    let reconciler = Reconciler::new(
        client,
        TARGET_IP,
        RecordOptions::default(),
        Arc::clone(&stats),
    );
    (Arc::new(reconciler), stats)
}

/// Poll `condition` until it holds, failing the test after five seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached within 5 seconds");
}
