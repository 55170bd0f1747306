//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Extracting the desired subdomain from a container's labels
//! - Checking the provider for an existing A record
//! - Creating the record when it is absent
//! - Counting what happened
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ ContainerObservation │
//! └──────────────────────┘
//!            │
//!            ▼
//!   ┌─────────────────┐   no match   ┌─────────┐
//!   │ extract_subdomain│────────────▶│ Ignored │
//!   └─────────────────┘              └─────────┘
//!            │ subdomain
//!            ▼
//!   ┌─────────────────┐   present    ┌─────────┐
//!   │ record_exists   │────────────▶│ Skipped │
//!   └─────────────────┘              └─────────┘
//!            │ absent / unknown
//!            ▼
//!   ┌─────────────────┐   ok         ┌─────────┐
//!   │ create_record   │────────────▶│ Created │
//!   └─────────────────┘              └─────────┘
//!            │ error after retries
//!            ▼
//!        ┌────────┐
//!        │ Failed │
//!        └────────┘
//! ```
//!
//! ## Pass Semantics
//!
//! 1. One observation is one reconciliation pass
//! 2. At most one create call per subdomain per pass, always after a fresh
//!    existence check in the same pass
//! 3. A failed pass never aborts a batch

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::client::{DnsClient, RecordPresence};
use crate::config::RecordOptions;
use crate::model::{ContainerObservation, DesiredRecord, Subdomain};
use crate::rules::extract_subdomain;
use crate::stats::ReconciliationStats;

/// Terminal state of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No routing rule for the managed domain; no provider calls made
    Ignored,

    /// The record already exists; no create call made
    Skipped {
        subdomain: Subdomain,
    },

    /// The record was created
    Created {
        subdomain: Subdomain,
        record_id: String,
    },

    /// Zone resolution or creation failed
    Failed {
        subdomain: Subdomain,
        error: String,
    },
}

impl Outcome {
    /// The subdomain this pass targeted, if any
    pub fn subdomain(&self) -> Option<&Subdomain> {
        match self {
            Outcome::Ignored => None,
            Outcome::Skipped { subdomain }
            | Outcome::Created { subdomain, .. }
            | Outcome::Failed { subdomain, .. } => Some(subdomain),
        }
    }
}

/// Tally of one full scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Observations processed
    pub total: usize,
    /// Observations without a matching routing rule
    pub ignored: usize,
    /// Records that already existed
    pub skipped: usize,
    /// Records created
    pub created: usize,
    /// Observations whose reconciliation failed
    pub failed: usize,
}

impl PassSummary {
    fn add(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Ignored => self.ignored += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Created { .. } => self.created += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Reconciliation engine
///
/// Stateless apart from the shared counters and the client's cached zone,
/// so a single instance can be shared behind an `Arc`.
///
/// ## Threading
///
/// The runner drives all reconciliation from one task. Concurrent calls are
/// still safe: counters are atomic and zone resolution tolerates a race.
pub struct Reconciler {
    client: DnsClient,
    target_ip: Ipv4Addr,
    record: RecordOptions,
    stats: Arc<ReconciliationStats>,
}

impl Reconciler {
    /// Create a reconciler
    ///
    /// # Parameters
    ///
    /// - `client`: Provider client bound to the base domain
    /// - `target_ip`: Address every created record points at
    /// - `record`: TTL and proxy flag for created records
    /// - `stats`: Shared counters, also read by the health surface
    pub fn new(
        client: DnsClient,
        target_ip: Ipv4Addr,
        record: RecordOptions,
        stats: Arc<ReconciliationStats>,
    ) -> Self {
        Self {
            client,
            target_ip,
            record,
            stats,
        }
    }

    /// The provider client
    pub fn client(&self) -> &DnsClient {
        &self.client
    }

    /// Shared counters
    pub fn stats(&self) -> &Arc<ReconciliationStats> {
        &self.stats
    }

    /// Target IPv4 address for created records
    pub fn target_ip(&self) -> Ipv4Addr {
        self.target_ip
    }

    /// Run one reconciliation pass for a container
    ///
    /// Never fails: every error is logged, counted and reported as
    /// [`Outcome::Failed`].
    pub async fn reconcile(&self, observation: &ContainerObservation) -> Outcome {
        let Some(subdomain) = extract_subdomain(&observation.labels, self.client.base_domain())
        else {
            debug!(
                container = observation.display_name(),
                "No routing rule for managed domain, ignoring"
            );
            return Outcome::Ignored;
        };

        self.stats.record_container_observed();
        let fqdn = self.client.fqdn(&subdomain);
        debug!(
            container = observation.display_name(),
            subdomain = %subdomain,
            fqdn = %fqdn,
            "Extracted subdomain"
        );

        match self.client.record_exists(&subdomain).await {
            Ok(RecordPresence::Present) => {
                info!(
                    container = observation.display_name(),
                    fqdn = %fqdn,
                    "DNS record already exists, skipping"
                );
                return Outcome::Skipped { subdomain };
            }
            Ok(RecordPresence::Absent) => {}
            Ok(RecordPresence::Unknown(_)) => {
                self.stats.record_provider_error();
            }
            Err(e) => {
                self.stats.record_provider_error();
                error!(
                    container = observation.display_name(),
                    fqdn = %fqdn,
                    error = %e,
                    "Cannot resolve DNS zone"
                );
                return Outcome::Failed {
                    subdomain,
                    error: e.to_string(),
                };
            }
        }

        let desired = DesiredRecord {
            subdomain,
            ip: self.target_ip,
            ttl: self.record.ttl,
            proxied: self.record.proxied,
        };

        match self.client.create_record(&desired).await {
            Ok(created) => {
                self.stats.record_created();
                Outcome::Created {
                    subdomain: desired.subdomain,
                    record_id: created.id,
                }
            }
            Err(e) => {
                self.stats.record_provider_error();
                error!(
                    container = observation.display_name(),
                    fqdn = %fqdn,
                    error = %e,
                    "Failed to create DNS record"
                );
                Outcome::Failed {
                    subdomain: desired.subdomain,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Reconcile every observation of a full scan, in order
    ///
    /// Failures do not stop the batch. When several containers in the same
    /// scan map to one subdomain, only the first reaches the provider; the
    /// rest are reported as skipped once it has been created or found.
    pub async fn reconcile_all(&self, observations: &[ContainerObservation]) -> PassSummary {
        let mut summary = PassSummary::default();
        let mut settled: HashSet<Subdomain> = HashSet::new();

        for observation in observations {
            if let Some(subdomain) =
                extract_subdomain(&observation.labels, self.client.base_domain())
            {
                if settled.contains(&subdomain) {
                    self.stats.record_container_observed();
                    debug!(
                        container = observation.display_name(),
                        subdomain = %subdomain,
                        "Subdomain already reconciled in this scan"
                    );
                    summary.add(&Outcome::Skipped { subdomain });
                    continue;
                }
            }

            let outcome = self.reconcile(observation).await;
            if let Outcome::Skipped { subdomain } | Outcome::Created { subdomain, .. } = &outcome {
                settled.insert(subdomain.clone());
            }
            summary.add(&outcome);
        }

        if summary.failed > 0 {
            warn!(
                total = summary.total,
                created = summary.created,
                skipped = summary.skipped,
                ignored = summary.ignored,
                failed = summary.failed,
                "Scan finished with failures"
            );
        } else {
            info!(
                total = summary.total,
                created = summary.created,
                skipped = summary.skipped,
                ignored = summary.ignored,
                "Scan finished"
            );
        }

        summary
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("client", &self.client)
            .field("target_ip", &self.target_ip)
            .field("record", &self.record)
            .finish()
    }
}
