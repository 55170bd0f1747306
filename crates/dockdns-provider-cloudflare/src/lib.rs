// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for dockdns.
//
// ## Implementation Status
//
// - ✅ Makes exactly one HTTP request per trait call
// - ✅ Full error propagation to the core (the `DnsClient` owns retry and backoff)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401, 403, 404, 429, 5xx)
// - ✅ API token or email + global key authentication
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (owned by `DnsClient`)
// - ❌ NO zone caching (owned by `DnsClient`)
// - ❌ NO background tasks
//
// ## Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the Cloudflare API only
// - ✅ Parse provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Implement retry logic
// - ❌ Decide whether a record should be created
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs or Debug output
// - Provider MUST fail fast if credentials are empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`

use async_trait::async_trait;
use dockdns_core::traits::{DnsProvider, RecordMetadata};
use dockdns_core::{Credentials, DesiredRecord, Error, Result, SyncConfig, Zone};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Provider name used in errors and logs
const PROVIDER_NAME: &str = "cloudflare";

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Record ID reported for creates skipped in dry-run mode
pub const DRY_RUN_RECORD_ID: &str = "dry-run";

/// How requests are authenticated
#[derive(Clone)]
enum CloudflareAuth {
    /// `Authorization: Bearer <token>`
    Token(String),
    /// `X-Auth-Email` + `X-Auth-Key`
    GlobalKey { email: String, key: String },
}

impl CloudflareAuth {
    fn from_credentials(credentials: &Credentials) -> Result<Self> {
        credentials.validate()?;
        Ok(match credentials {
            Credentials::ApiToken { token } => CloudflareAuth::Token(token.clone()),
            Credentials::GlobalKey { email, key } => CloudflareAuth::GlobalKey {
                email: email.clone(),
                key: key.clone(),
            },
        })
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            CloudflareAuth::Token(token) => request.bearer_auth(token),
            CloudflareAuth::GlobalKey { email, key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            CloudflareAuth::Token(_) => "api_token",
            CloudflareAuth::GlobalKey { .. } => "global_key",
        }
    }
}

/// Response envelope shared by every Cloudflare API v4 endpoint
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ZoneResult {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecordResult {
    id: String,
    name: String,
    content: String,
    #[serde(default)]
    ttl: Option<u32>,
    #[serde(default)]
    proxied: bool,
}

impl From<DnsRecordResult> for RecordMetadata {
    fn from(r: DnsRecordResult) -> Self {
        RecordMetadata {
            id: r.id,
            name: r.name,
            content: r.content,
            ttl: r.ttl,
            proxied: r.proxied,
        }
    }
}

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// This provider is isolated, stateless, and single-shot. Zone caching and
/// retries belong to `dockdns_core::DnsClient`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended POST payload
/// - **NOT** actually create DNS records
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose credentials.
pub struct CloudflareProvider {
    /// ⚠️ NEVER log this value
    auth: CloudflareAuth,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// API base URL (overridable for tests)
    api_base: String,

    /// Dry-run mode: perform lookups but skip creates
    dry_run: bool,
}

// Custom Debug implementation that hides credentials
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("auth", &self.auth.kind())
            .field("credentials", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `credentials`: API token with Zone:DNS:Edit permission, or email + global key
    /// - `dry_run`: If true, perform lookups but skip creates
    ///
    /// # Returns
    ///
    /// - `Ok(CloudflareProvider)`: Ready to use
    /// - `Err(Error::Config)`: Credentials are empty
    /// - `Err(Error::Provider)`: The HTTP client could not be built
    pub fn new(credentials: &Credentials, dry_run: bool) -> Result<Self> {
        let auth = CloudflareAuth::from_credentials(credentials)?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::provider(PROVIDER_NAME, format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            auth,
            client,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            dry_run,
        })
    }

    /// Create a provider from the sync configuration
    ///
    /// Honors `config.dry_run`.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let provider = Self::new(&config.credentials, config.dry_run)?;
        if provider.dry_run {
            tracing::warn!(
                "Cloudflare provider running in DRY-RUN mode - no records will be created"
            );
        }
        Ok(provider)
    }

    /// Point the provider at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether creates are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send one request and decode the envelope's `result`
    ///
    /// # Parameters
    ///
    /// - `request`: Prepared request (authentication is added here)
    /// - `context`: Operation name for error messages
    /// - `not_found`: Error to return on HTTP 404
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
        not_found: impl FnOnce() -> Error,
    ) -> Result<T> {
        let response = self
            .auth
            .apply(request)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            if status == StatusCode::NOT_FOUND {
                return Err(not_found());
            }
            return Err(map_status(status, &error_text, context));
        }

        let envelope: ApiEnvelope<T> = response.json().await.map_err(|e| {
            Error::provider(PROVIDER_NAME, format!("Failed to parse response: {}", e))
        })?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("{} failed: {}", context, describe(&envelope.errors)),
            ));
        }

        envelope.result.ok_or_else(|| {
            Error::provider(
                PROVIDER_NAME,
                format!("Invalid response format: {} returned no result", context),
            )
        })
    }

    /// Query A records in a zone, optionally filtered by name
    async fn query_a_records(
        &self,
        zone: &Zone,
        name: Option<&str>,
    ) -> Result<Vec<DnsRecordResult>> {
        let url = format!("{}/zones/{}/dns_records", self.api_base, zone.id);
        let mut query = vec![("type", "A")];
        if let Some(name) = name {
            query.push(("name", name));
        }

        let request = self.client.get(&url).query(&query);
        let zone_name = zone.name.clone();
        self.send(request, "Record lookup", move || {
            Error::zone_not_found(format!("Zone {} no longer exists", zone_name))
        })
        .await
    }
}

/// Map a non-success HTTP status to an error
fn map_status(status: StatusCode, body: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API credentials or insufficient permissions. Status: {}",
            status
        )),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("Cloudflare server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("{} failed: {} - {}", context, status, body),
        ),
    }
}

fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "unknown API error".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Look up the zone for `domain`
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn find_zone(&self, domain: &str) -> Result<Zone> {
        tracing::debug!(domain, "Looking up Cloudflare zone");

        let url = format!("{}/zones", self.api_base);
        let request = self.client.get(&url).query(&[("name", domain)]);
        let zones: Vec<ZoneResult> = self
            .send(request, "Zone lookup", || {
                Error::zone_not_found(format!("No Cloudflare zone for {}", domain))
            })
            .await?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::zone_not_found(format!("No Cloudflare zone for {}", domain)))?;

        tracing::debug!(zone = %zone.name, zone_id = %zone.id, "Found zone");
        Ok(Zone {
            name: zone.name,
            id: zone.id,
        })
    }

    /// Check for an A record named `fqdn`
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=api.example.com
    /// ```
    async fn a_record_exists(&self, zone: &Zone, fqdn: &str) -> Result<bool> {
        let records = self.query_a_records(zone, Some(fqdn)).await?;
        Ok(!records.is_empty())
    }

    /// Create an A record
    ///
    /// # API Call (skipped in dry-run mode)
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {
    ///   "type": "A",
    ///   "name": "api.example.com",
    ///   "content": "203.0.113.10",
    ///   "ttl": 300,
    ///   "proxied": false
    /// }
    /// ```
    async fn create_a_record(
        &self,
        zone: &Zone,
        fqdn: &str,
        record: &DesiredRecord,
    ) -> Result<RecordMetadata> {
        let payload = serde_json::json!({
            "type": "A",
            "name": fqdn,
            "content": record.ip.to_string(),
            "ttl": record.ttl,
            "proxied": record.proxied,
        });

        if self.dry_run {
            tracing::info!(
                fqdn,
                zone_id = %zone.id,
                payload = %payload,
                "[DRY-RUN] Would create DNS record"
            );
            return Ok(RecordMetadata {
                id: DRY_RUN_RECORD_ID.to_string(),
                name: fqdn.to_string(),
                content: record.ip.to_string(),
                ttl: Some(record.ttl),
                proxied: record.proxied,
            });
        }

        let url = format!("{}/zones/{}/dns_records", self.api_base, zone.id);
        let request = self.client.post(&url).json(&payload);
        let zone_name = zone.name.clone();
        let created: DnsRecordResult = self
            .send(request, "Record creation", move || {
                Error::zone_not_found(format!("Zone {} no longer exists", zone_name))
            })
            .await?;

        Ok(created.into())
    }

    /// List every A record in the zone
    async fn list_a_records(&self, zone: &Zone) -> Result<Vec<RecordMetadata>> {
        let records = self.query_a_records(zone, None).await?;
        Ok(records.into_iter().map(RecordMetadata::from).collect())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
