// # DNS Provider Trait
//
// Defines the interface for querying and creating DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `dockdns-provider-cloudflare` crate
//
// ## Usage
//
// Callers do not use providers directly. The core `DnsClient` wraps a
// provider, caches the resolved zone and owns the retry policy:
//
// ```rust,ignore
// use dockdns_core::{DnsClient, RetryPolicy};
//
// let client = DnsClient::new(provider, "example.com", RetryPolicy::default());
// let zone = client.resolve_zone().await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{DesiredRecord, Zone};

/// Metadata about an A record held by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// The record ID (provider-specific)
    pub id: String,
    /// The fully qualified record name
    pub name: String,
    /// The record content (IPv4 address as text)
    pub content: String,
    /// Time-to-live for the record
    pub ttl: Option<u32>,
    /// Whether the record is proxied
    pub proxied: bool,
}

/// Trait for DNS provider implementations
///
/// This trait defines the interface for the three calls the sync engine
/// needs: zone lookup, A-record lookup and A-record creation.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Untrusted
///
/// DNS providers are **untrusted** components with strict limitations:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure (the `DnsClient` handles retry)
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Implement retry logic or backoff (owned by `DnsClient`)
/// - ❌ Cache zone IDs or record state (owned by `DnsClient` / the provider itself)
/// - ❌ Decide whether a record should be created (owned by `Reconciler`)
///
/// ## Rationale
///
/// Providers are external integrations that should be:
/// - **Stateless**: No state between requests
/// - **Single-shot**: Execute one API call per invocation
///
/// **Correct approach on failure**: Return an error. The `DnsClient` will
/// retry creation according to its configured policy.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the zone that holds `domain`
    ///
    /// # Returns
    ///
    /// - `Ok(Zone)`: The zone and its provider-assigned identifier
    /// - `Err(Error::ZoneNotFound)`: The provider has no such zone
    /// - `Err(Error)`: Transport or authentication failure
    async fn find_zone(&self, domain: &str) -> Result<Zone, crate::Error>;

    /// Check whether an A record named `fqdn` exists in `zone`
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: At least one A record with that name exists
    /// - `Ok(false)`: No A record with that name
    /// - `Err(Error)`: The lookup itself failed
    async fn a_record_exists(&self, zone: &Zone, fqdn: &str) -> Result<bool, crate::Error>;

    /// Create an A record named `fqdn` in `zone`
    ///
    /// Exactly one API call. No existence check, no retry.
    ///
    /// # Returns
    ///
    /// - `Ok(RecordMetadata)`: The created record
    /// - `Err(Error)`: If creation failed
    async fn create_a_record(
        &self,
        zone: &Zone,
        fqdn: &str,
        record: &DesiredRecord,
    ) -> Result<RecordMetadata, crate::Error>;

    /// List all A records in `zone` (diagnostics only)
    async fn list_a_records(&self, zone: &Zone) -> Result<Vec<RecordMetadata>, crate::Error>;

    /// Get the provider name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "cloudflare")
    fn provider_name(&self) -> &'static str;
}
