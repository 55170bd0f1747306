// # HTTP IP Source
//
// This crate determines the host's public IPv4 address, the target of
// every record dockdns creates.
//
// ## Resolution Order
//
// 1. An explicit override (`PUBLIC_IP`), validated as IPv4
// 2. Plain-text "what is my IP" services, tried in order until one answers
//    with an IPv4 address
//
// The address is resolved once and cached; there is no polling.

use dockdns_core::traits::IpSource;
use dockdns_core::{Error, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::sync::Mutex;

/// Default IP check services, tried in order
pub const DEFAULT_IP_SERVICES: &[&str] = &[
    "https://api.ipify.org",  // returns plain text IP
    "https://ifconfig.me/ip", // returns plain text IP
    "https://ip.sb",          // returns plain text IP
];

/// Per-service request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based public IPv4 source
pub struct HttpIpSource {
    /// Services to query, in order
    services: Vec<String>,

    /// Explicit address that skips detection
    override_ip: Option<Ipv4Addr>,

    /// Resolved address (cached)
    current_ip: Mutex<Option<Ipv4Addr>>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source over the default services
    pub fn new() -> Result<Self> {
        Self::with_services(DEFAULT_IP_SERVICES.iter().map(|s| s.to_string()).collect())
    }

    /// Create a source over custom services
    ///
    /// # Parameters
    ///
    /// - `services`: URLs returning the caller's IP as plain text
    pub fn with_services(services: Vec<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::ip_detection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            services,
            override_ip: None,
            current_ip: Mutex::new(None),
            client,
        })
    }

    /// Use `ip` instead of asking any service
    pub fn with_override(mut self, ip: Option<Ipv4Addr>) -> Self {
        self.override_ip = ip;
        self
    }

    /// Fetch the address from one service
    async fn fetch_ip(&self, url: &str) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ip_detection(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_detection(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let ip_text = response
            .text()
            .await
            .map_err(|e| Error::ip_detection(format!("Failed to read response: {}", e)))?;

        parse_ipv4(&ip_text)
    }

    /// Try every service in order
    async fn detect(&self) -> Result<Ipv4Addr> {
        for url in &self.services {
            match self.fetch_ip(url).await {
                Ok(ip) => {
                    tracing::info!(service = %url, ip = %ip, "Detected public IP");
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::warn!(service = %url, error = %e, "IP detection service failed");
                }
            }
        }

        Err(Error::ip_detection(format!(
            "Could not determine public IP from {} service(s)",
            self.services.len()
        )))
    }
}

/// Parse a service response body as an IPv4 address
pub fn parse_ipv4(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();
    text.parse::<Ipv4Addr>()
        .map_err(|_| Error::ip_detection(format!("Expected IPv4, got: {:?}", text)))
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        if let Some(ip) = self.override_ip {
            tracing::info!(ip = %ip, "Using configured public IP");
            return Ok(ip);
        }

        let mut cached = self.current_ip.lock().await;
        if let Some(ip) = *cached {
            return Ok(ip);
        }

        let ip = self.detect().await?;
        *cached = Some(ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        if self.override_ip.is_some() {
            "static"
        } else {
            "http"
        }
    }
}
