// Daemon configuration
//
// Everything is read from the environment exactly once, before any provider,
// container runtime or IP detection call is made.

use anyhow::{Context, Result};
use dockdns_core::config::{Credentials, RecordOptions, SyncConfig};
use std::env;
use std::net::{Ipv4Addr, SocketAddr};

const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8000";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable text
    Text,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub domain: String,
    pub credentials: Credentials,
    pub public_ip: Option<Ipv4Addr>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub record: RecordOptions,
    pub health_addr: SocketAddr,
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let domain = var("DOMAIN")
            .context("DOMAIN is required. Set it via: export DOMAIN=example.com")?;

        let credentials = Credentials::from_parts(
            var("CF_DNS_API_TOKEN"),
            var("CF_API_EMAIL"),
            var("CF_API_KEY"),
        )
        .context("Set CF_DNS_API_TOKEN, or both CF_API_EMAIL and CF_API_KEY")?;

        let public_ip = var("PUBLIC_IP")
            .map(|raw| {
                raw.parse::<Ipv4Addr>()
                    .with_context(|| format!("PUBLIC_IP must be an IPv4 address. Got: {}", raw))
            })
            .transpose()?;

        let log_format = match var("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
            None => LogFormat::Json,
            Some(f) if f == "json" => LogFormat::Json,
            Some(f) if f == "text" => LogFormat::Text,
            Some(other) => anyhow::bail!(
                "LOG_FORMAT '{}' is not valid. Valid formats: json, text",
                other
            ),
        };

        let mut record = RecordOptions::default();
        if let Some(raw) = var("DNS_RECORD_TTL") {
            record.ttl = raw
                .parse()
                .with_context(|| format!("DNS_RECORD_TTL must be a number. Got: {}", raw))?;
        }
        if let Some(raw) = var("DNS_RECORD_PROXIED") {
            record.proxied = parse_bool(&raw).with_context(|| {
                format!("DNS_RECORD_PROXIED must be true or false. Got: {}", raw)
            })?;
        }

        let health_addr = var("HEALTH_ADDR").unwrap_or_else(|| DEFAULT_HEALTH_ADDR.to_string());
        let health_addr = health_addr
            .parse()
            .with_context(|| format!("HEALTH_ADDR must be host:port. Got: {}", health_addr))?;

        let dry_run = match var("DNS_SYNC_MODE").as_deref() {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!(
                "DNS_SYNC_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        Ok(Self {
            domain,
            credentials,
            public_ip,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
            record,
            health_addr,
            dry_run,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.to_sync_config().validate()?;
        Ok(())
    }

    /// Build the core sync configuration
    pub fn to_sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::new(self.domain.clone(), self.credentials.clone());
        config.record = self.record;
        config.public_ip = self.public_ip;
        config.dry_run = self.dry_run;
        config
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
