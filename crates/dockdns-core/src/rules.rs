//! Routing rule extraction
//!
//! Turns a container's reverse-proxy labels into the subdomain that should
//! resolve to this host. Pure: no I/O, no logging above debug.
//!
//! ```text
//! traefik.enable = "true"
//! traefik.http.routers.api.rule = Host(`api.example.com`)
//!                                         │
//!                    base domain "example.com"
//!                                         ▼
//!                                 Subdomain::Name("api")
//! ```

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::validate_domain_name;
use crate::model::Subdomain;

/// Label that opts a container into proxy routing
pub const ROUTING_ENABLED_LABEL: &str = "traefik.enable";

/// Exact value of [`ROUTING_ENABLED_LABEL`] that enables routing
pub const ROUTING_ENABLED_VALUE: &str = "true";

static ROUTER_RULE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^traefik\.http\.routers\..+\.rule$").expect("valid regex")
});

// Host(`a.example.com`) or Host(\`a.example.com\`)
static HOST_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Host\([`\\]+([^`\\]+)[`\\]+\)").expect("valid regex")
});

/// Whether the label set opts into proxy routing
pub fn routing_enabled(labels: &BTreeMap<String, String>) -> bool {
    labels
        .get(ROUTING_ENABLED_LABEL)
        .is_some_and(|v| v == ROUTING_ENABLED_VALUE)
}

/// Extract the desired subdomain from a container's labels
///
/// Router rule labels are scanned in lexicographic key order and every
/// `Host(...)` expression inside a rule is a candidate, in textual order.
/// The first candidate that is a valid, non-wildcard hostname under
/// `base_domain` wins.
///
/// # Parameters
///
/// - `labels`: Container labels
/// - `base_domain`: Managed base domain (e.g., "example.com")
///
/// # Returns
///
/// - `Some(Subdomain::Apex)`: A rule routes the base domain itself
/// - `Some(Subdomain::Name(..))`: A rule routes `<name>.<base_domain>`
/// - `None`: Routing disabled, or no rule matches the base domain
pub fn extract_subdomain(
    labels: &BTreeMap<String, String>,
    base_domain: &str,
) -> Option<Subdomain> {
    if !routing_enabled(labels) {
        return None;
    }

    let base = base_domain.trim_end_matches('.').to_ascii_lowercase();

    labels
        .iter()
        .filter(|(key, _)| ROUTER_RULE_KEY.is_match(key))
        .flat_map(|(_, rule)| host_candidates(rule))
        .find_map(|host| match_base_domain(&host, &base))
}

/// All hostnames named by `Host(...)` expressions in a rule, in order
pub fn host_candidates(rule: &str) -> Vec<String> {
    HOST_EXPR
        .captures_iter(rule)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_ascii_lowercase())
        .collect()
}

fn match_base_domain(host: &str, base: &str) -> Option<Subdomain> {
    if host.starts_with('*') {
        debug!(host, "Skipping wildcard host");
        return None;
    }

    if validate_domain_name(host).is_err() {
        debug!(host, "Skipping malformed host");
        return None;
    }

    if host == base {
        return Some(Subdomain::Apex);
    }

    host.strip_suffix(base)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| Subdomain::Name(prefix.to_string()))
}
