//! Core traits for the container DNS sync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: Query and create DNS records via provider APIs
//! - [`ContainerSource`]: List running containers and watch start events
//! - [`IpSource`]: Determine the public IPv4 target for records

pub mod container_source;
pub mod dns_provider;
pub mod ip_source;

pub use container_source::{ContainerEventStream, ContainerSource};
pub use dns_provider::{DnsProvider, RecordMetadata};
pub use ip_source::IpSource;
