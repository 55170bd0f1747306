//! Configuration types for the container DNS sync system
//!
//! This module defines all configuration structures used throughout the crate.
//! The daemon builds a [`SyncConfig`] from environment variables; library
//! users can build one directly.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base domain whose zone is managed (e.g., "example.com")
    pub base_domain: String,

    /// DNS provider credentials
    pub credentials: Credentials,

    /// Options applied to every created record
    #[serde(default)]
    pub record: RecordOptions,

    /// Retry settings for record creation
    #[serde(default)]
    pub retry: RetryConfig,

    /// Explicit public IPv4 (skips auto-detection)
    #[serde(default)]
    pub public_ip: Option<Ipv4Addr>,

    /// Dry-run mode: perform lookups but never create records
    #[serde(default)]
    pub dry_run: bool,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults for everything but the
    /// base domain and credentials
    pub fn new(base_domain: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_domain: base_domain.into(),
            credentials,
            record: RecordOptions::default(),
            retry: RetryConfig::default(),
            public_ip: None,
            dry_run: false,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.base_domain.is_empty() {
            return Err(crate::Error::config("Base domain is required"));
        }

        validate_domain_name(&self.normalized_domain())
            .map_err(|e| crate::Error::config(format!("Invalid base domain: {}", e)))?;
        self.credentials.validate()?;
        self.record.validate()?;
        self.retry.validate()?;

        Ok(())
    }

    /// Base domain, lower-cased with any trailing dot removed
    pub fn normalized_domain(&self) -> String {
        self.base_domain.trim_end_matches('.').to_ascii_lowercase()
    }
}

/// DNS provider credentials
///
/// Exactly one form must be present. A token takes precedence over an
/// email + key pair.
///
/// # Security
///
/// The Debug implementation never exposes the secret values.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// Scoped API token (Authorization: Bearer)
    ApiToken {
        /// API token
        token: String,
    },

    /// Account email + global API key
    GlobalKey {
        /// Account email
        email: String,
        /// Global API key
        key: String,
    },
}

impl Credentials {
    /// Pick the credential form from optional raw values
    ///
    /// Empty strings count as absent.
    ///
    /// # Returns
    ///
    /// - `Ok(Credentials)`: A token, or else a complete email + key pair
    /// - `Err(Error::Config)`: Neither form is complete
    pub fn from_parts(
        token: Option<String>,
        email: Option<String>,
        key: Option<String>,
    ) -> Result<Self, crate::Error> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(token) = present(token) {
            return Ok(Self::ApiToken { token });
        }

        match (present(email), present(key)) {
            (Some(email), Some(key)) => Ok(Self::GlobalKey { email, key }),
            _ => Err(crate::Error::config(
                "DNS provider credentials required: api token or (api email + api key)",
            )),
        }
    }

    /// Validate that the selected form is complete
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            Credentials::ApiToken { token } if token.is_empty() => {
                Err(crate::Error::config("API token cannot be empty"))
            }
            Credentials::GlobalKey { email, key } if email.is_empty() || key.is_empty() => Err(
                crate::Error::config("API email and API key must both be set"),
            ),
            _ => Ok(()),
        }
    }

    /// Short name of the credential form (safe to log)
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::ApiToken { .. } => "api_token",
            Credentials::GlobalKey { .. } => "global_key",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiToken { .. } => f
                .debug_struct("ApiToken")
                .field("token", &"<REDACTED>")
                .finish(),
            Credentials::GlobalKey { email, .. } => f
                .debug_struct("GlobalKey")
                .field("email", email)
                .field("key", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Options applied to created A records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOptions {
    /// Time-to-live in seconds (1 means "automatic" at most providers)
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Whether traffic goes through the provider's proxy
    #[serde(default)]
    pub proxied: bool,
}

impl RecordOptions {
    /// Validate the TTL range
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ttl != 1 && !(60..=86400).contains(&self.ttl) {
            return Err(crate::Error::config(format!(
                "Record TTL must be 1 (automatic) or between 60 and 86400 seconds. Got: {}",
                self.ttl
            )));
        }
        Ok(())
    }
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            proxied: false,
        }
    }
}

fn default_ttl() -> u32 {
    300
}

/// Retry configuration for record creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (in seconds)
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,

    /// Upper bound for any single delay (in seconds)
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl RetryConfig {
    /// Validate the retry configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("Retry max_attempts must be >= 1"));
        }
        if self.max_delay_secs < self.base_delay_secs {
            return Err(crate::Error::config(
                "Retry max_delay_secs must be >= base_delay_secs",
            ));
        }
        Ok(())
    }

    /// Build the retry policy used by the DNS client
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.base_delay_secs),
            Duration::from_secs(self.max_delay_secs),
        )
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_secs() -> u64 {
    1
}

fn default_max_delay_secs() -> u64 {
    16
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the container event channel
    ///
    /// The event source blocks when the channel is full, which applies
    /// backpressure to the container runtime subscription.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Capacity of the resync request channel
    ///
    /// Requests arriving while the channel is full are dropped; a pending
    /// resync already covers them.
    #[serde(default = "default_resync_channel_capacity")]
    pub resync_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            resync_channel_capacity: default_resync_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_resync_channel_capacity() -> usize {
    4
}

/// Validate that a string is a valid domain name
///
/// This implements basic DNS domain name validation per RFC 1035.
/// It's not comprehensive but catches common errors.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::invalid_input("Domain name cannot be empty"));
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        return Err(crate::Error::invalid_input(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::invalid_input(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::invalid_input(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        // Underscore is allowed for service-style labels (_acme-challenge)
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(crate::Error::invalid_input(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::invalid_input(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
