//! Reconciliation counters
//!
//! Three process-lifetime counters, mutated only by the reconciler and read
//! by the health surface. Each update is mirrored to the `metrics` facade so
//! an installed recorder (Prometheus in the daemon) sees the same values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter name for records created
pub const RECORDS_CREATED_METRIC: &str = "dns_records_created_total";
/// Counter name for provider errors
pub const PROVIDER_ERRORS_METRIC: &str = "dns_api_errors_total";
/// Gauge name for containers observed with a routing rule
pub const CONTAINERS_OBSERVED_METRIC: &str = "dns_containers_monitored";

/// Monotonic reconciliation counters
#[derive(Debug)]
pub struct ReconciliationStats {
    started_at: DateTime<Utc>,
    containers_observed: AtomicU64,
    records_created: AtomicU64,
    provider_errors: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Containers whose labels yielded a subdomain
    pub containers_monitored: u64,
    /// Records successfully created
    pub dns_records_created: u64,
    /// Failed provider calls (existence checks, final create failures, zone lookups)
    pub api_errors: u64,
}

impl ReconciliationStats {
    /// Create zeroed counters stamped with the current time
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            containers_observed: AtomicU64::new(0),
            records_created: AtomicU64::new(0),
            provider_errors: AtomicU64::new(0),
        }
    }

    /// Seconds since the counters were created, never negative
    pub fn uptime_secs(&self) -> u64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0) as u64
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            containers_monitored: self.containers_observed.load(Ordering::Relaxed),
            dns_records_created: self.records_created.load(Ordering::Relaxed),
            api_errors: self.provider_errors.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_container_observed(&self) {
        let total = self.containers_observed.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!(CONTAINERS_OBSERVED_METRIC).set(total as f64);
    }

    pub(crate) fn record_created(&self) {
        self.records_created.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(RECORDS_CREATED_METRIC).increment(1);
    }

    pub(crate) fn record_provider_error(&self) {
        self.provider_errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(PROVIDER_ERRORS_METRIC).increment(1);
    }
}

impl Default for ReconciliationStats {
    fn default() -> Self {
        Self::new()
    }
}
