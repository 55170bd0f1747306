//! Data model shared by the extractor, DNS client and reconciler
//!
//! Observations and desired records are ephemeral: produced per scan or
//! event, consumed by one reconciliation pass, never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

/// Apex sentinel used in place of a subdomain label
pub const APEX: &str = "@";

/// A container as seen by one scan or one start event
///
/// Labels are kept in a `BTreeMap` so rule extraction walks them in
/// lexicographic key order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerObservation {
    /// Container ID
    pub id: String,
    /// Container name (without the leading slash)
    pub name: String,
    /// Container labels
    pub labels: BTreeMap<String, String>,
}

impl ContainerObservation {
    /// Create an observation
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        labels: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            labels: labels.into_iter().collect(),
        }
    }

    /// Name for log lines: the container name, or the short ID if unnamed
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            self.id.get(..12).unwrap_or(&self.id)
        }
    }
}

/// Relative name of a record inside the zone
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subdomain {
    /// The base domain itself
    Apex,
    /// A name below the base domain (may contain dots, e.g. "api.eu")
    Name(String),
}

impl Subdomain {
    /// Fully qualified name of this subdomain under `base_domain`
    pub fn fqdn(&self, base_domain: &str) -> String {
        match self {
            Subdomain::Apex => base_domain.to_string(),
            Subdomain::Name(name) => format!("{}.{}", name, base_domain),
        }
    }
}

impl fmt::Display for Subdomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subdomain::Apex => f.write_str(APEX),
            Subdomain::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Subdomain {
    fn from(value: &str) -> Self {
        if value == APEX || value.is_empty() {
            Subdomain::Apex
        } else {
            Subdomain::Name(value.to_string())
        }
    }
}

/// The A record a container wants to exist
///
/// Recomputed on every pass, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRecord {
    /// Name relative to the base domain
    pub subdomain: Subdomain,
    /// Target IPv4 address
    pub ip: Ipv4Addr,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Whether the record is proxied by the provider
    pub proxied: bool,
}

/// A provider zone resolved for the base domain
///
/// Resolved once per process and never re-resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Base domain (e.g., "example.com")
    pub name: String,
    /// Provider-assigned zone identifier
    pub id: String,
}
