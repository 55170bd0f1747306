//! Error types for the container DNS sync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dockdns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the container DNS sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing domain, missing or partial credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider has no zone for the configured base domain
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// Provider-specific error (transport failure, API error, unavailable)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The container event subscription failed or ended
    #[error("Event stream error: {0}")]
    EventStream(String),

    /// Container runtime errors (list, inspect)
    #[error("Container runtime error: {0}")]
    ContainerRuntime(String),

    /// Public IP detection errors
    #[error("IP detection error: {0}")]
    IpDetection(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "zone not found" error
    pub fn zone_not_found(msg: impl Into<String>) -> Self {
        Self::ZoneNotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create an event stream error
    pub fn event_stream(msg: impl Into<String>) -> Self {
        Self::EventStream(msg.into())
    }

    /// Create a container runtime error
    pub fn container_runtime(msg: impl Into<String>) -> Self {
        Self::ContainerRuntime(msg.into())
    }

    /// Create an IP detection error
    pub fn ip_detection(msg: impl Into<String>) -> Self {
        Self::IpDetection(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error must terminate the process.
    ///
    /// Only configuration errors and event stream failures are fatal.
    /// Everything else is logged, counted, and left for the next
    /// reconciliation opportunity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::EventStream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_and_stream_errors_are_fatal() {
        assert!(Error::config("missing DOMAIN").is_fatal());
        assert!(Error::event_stream("connection reset").is_fatal());

        assert!(!Error::zone_not_found("example.com").is_fatal());
        assert!(!Error::provider("cloudflare", "503").is_fatal());
        assert!(!Error::rate_limited("slow down").is_fatal());
        assert!(!Error::container_runtime("inspect failed").is_fatal());
    }

    fn assert_boxable<E: std::error::Error + Send + Sync + 'static>(_: &E) {}

    #[test]
    fn every_variant_carries_its_own_message() {
        let errors = [
            Error::config("missing DOMAIN"),
            Error::zone_not_found("example.com"),
            Error::provider("cloudflare", "503"),
            Error::rate_limited("slow down"),
            Error::event_stream("connection reset"),
            Error::container_runtime("inspect failed"),
            Error::auth("bad token"),
            Error::ip_detection("no service answered"),
            Error::invalid_input("bad label"),
        ];
        for err in &errors {
            assert_boxable(err);
            assert!(!err.to_string().is_empty());
        }
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(Error::config("x"));
        assert!(boxed.to_string().contains('x'));
    }

    #[test]
    fn provider_error_display_names_provider() {
        let err = Error::provider("cloudflare", "HTTP request failed");
        assert_eq!(
            err.to_string(),
            "Provider error (cloudflare): HTTP request failed"
        );
    }
}
