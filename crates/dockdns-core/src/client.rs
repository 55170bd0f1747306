//! DNS provider client
//!
//! Wraps a single-shot [`DnsProvider`] with the behavior the reconciler
//! relies on:
//! - zone resolution on first use, cached for the life of the process
//! - existence checks that degrade to "unknown" instead of failing
//! - record creation under an explicit [`RetryPolicy`]

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{DesiredRecord, Subdomain, Zone};
use crate::retry::RetryPolicy;
use crate::traits::{DnsProvider, RecordMetadata};

/// Result of an existence check
///
/// A failed query is not an error for the caller: it reports
/// [`RecordPresence::Unknown`] carrying the failure, and the reconciler
/// treats it as absent.
#[derive(Debug)]
pub enum RecordPresence {
    /// An A record with the name exists
    Present,
    /// No A record with the name exists
    Absent,
    /// The provider query failed
    Unknown(Error),
}

/// Provider client bound to one base domain
///
/// All operations target exactly one base domain and, once resolved, one
/// zone identifier. The zone is never re-resolved.
pub struct DnsClient {
    provider: Arc<dyn DnsProvider>,
    base_domain: String,
    zone: OnceCell<Zone>,
    retry: RetryPolicy,
}

impl DnsClient {
    /// Create a client
    ///
    /// # Parameters
    ///
    /// - `provider`: Single-shot provider implementation
    /// - `base_domain`: Managed base domain (normalized to lower case, no trailing dot)
    /// - `retry`: Policy applied to record creation
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        base_domain: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        let base_domain = base_domain.into().trim_end_matches('.').to_ascii_lowercase();
        Self {
            provider,
            base_domain,
            zone: OnceCell::new(),
            retry,
        }
    }

    /// The managed base domain
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// The provider's name
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Fully qualified name for a subdomain of the base domain
    pub fn fqdn(&self, subdomain: &Subdomain) -> String {
        subdomain.fqdn(&self.base_domain)
    }

    /// The cached zone, if already resolved
    pub fn cached_zone(&self) -> Option<&Zone> {
        self.zone.get()
    }

    /// Resolve the zone for the base domain
    ///
    /// The first successful lookup is cached for the process lifetime.
    /// Failures are not cached and not retried here: a missing zone is a
    /// configuration problem, and the next caller simply tries again.
    ///
    /// # Returns
    ///
    /// - `Ok(&Zone)`: The resolved zone
    /// - `Err(Error::ZoneNotFound)`: The provider has no zone for the base domain
    /// - `Err(Error)`: Transport or authentication failure
    pub async fn resolve_zone(&self) -> Result<&Zone> {
        self.zone
            .get_or_try_init(|| async {
                let zone = self.provider.find_zone(&self.base_domain).await?;
                if zone.id.is_empty() {
                    return Err(Error::zone_not_found(format!(
                        "Provider returned an empty zone ID for {}",
                        self.base_domain
                    )));
                }
                info!(
                    provider = self.provider.provider_name(),
                    zone = %zone.name,
                    zone_id = %zone.id,
                    "Resolved DNS zone"
                );
                Ok(zone)
            })
            .await
    }

    /// Check whether an A record exists for `subdomain`
    ///
    /// Always queries the provider; nothing is cached.
    ///
    /// # Returns
    ///
    /// - `Ok(RecordPresence)`: Present, absent, or unknown (query failed)
    /// - `Err(Error)`: Zone resolution failed
    pub async fn record_exists(&self, subdomain: &Subdomain) -> Result<RecordPresence> {
        let zone = self.resolve_zone().await?;
        let fqdn = self.fqdn(subdomain);

        match self.provider.a_record_exists(zone, &fqdn).await {
            Ok(true) => {
                debug!(fqdn = %fqdn, "DNS record exists");
                Ok(RecordPresence::Present)
            }
            Ok(false) => {
                debug!(fqdn = %fqdn, "DNS record not found");
                Ok(RecordPresence::Absent)
            }
            Err(e) => {
                warn!(fqdn = %fqdn, error = %e, "Failed to check DNS record, assuming absent");
                Ok(RecordPresence::Unknown(e))
            }
        }
    }

    /// Create the A record described by `record`
    ///
    /// Each attempt is one provider call. Failed attempts are retried per the
    /// client's [`RetryPolicy`]; once the budget is spent the last error is
    /// returned.
    ///
    /// # Returns
    ///
    /// - `Ok(RecordMetadata)`: The created record
    /// - `Err(Error)`: Zone resolution failed, or every attempt failed
    pub async fn create_record(&self, record: &DesiredRecord) -> Result<RecordMetadata> {
        let zone = self.resolve_zone().await?;
        let fqdn = self.fqdn(&record.subdomain);

        let provider = self.provider.as_ref();
        let name = fqdn.as_str();

        let created = self
            .retry
            .run("create_record", move |attempt| {
                debug!(fqdn = name, attempt, "Creating DNS record");
                provider.create_a_record(zone, name, record)
            })
            .await?;

        info!(
            fqdn = %fqdn,
            ip = %record.ip,
            record_id = %created.id,
            "Created DNS record"
        );
        Ok(created)
    }

    /// List all A records in the zone (diagnostics only)
    pub async fn list_records(&self) -> Result<Vec<RecordMetadata>> {
        let zone = self.resolve_zone().await?;
        self.provider.list_a_records(zone).await
    }
}

impl std::fmt::Debug for DnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsClient")
            .field("provider", &self.provider.provider_name())
            .field("base_domain", &self.base_domain)
            .field("zone", &self.zone.get())
            .field("retry", &self.retry)
            .finish()
    }
}
