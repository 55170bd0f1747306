// # dockdns-core
//
// Core library for keeping a DNS zone in sync with proxy-routed containers.
//
// ## Architecture Overview
//
// Data flows one way:
//
// ```text
// ContainerSource → rules::extract_subdomain → Reconciler → DnsClient → DnsProvider
// ```
//
// - **ContainerSource**: Trait for listing running containers and watching starts
// - **DnsProvider**: Trait for single-shot zone and A-record calls to a provider API
// - **IpSource**: Trait for determining the public IPv4 target
// - **DnsClient**: Zone cache, existence checks and retried creation
// - **Reconciler**: Per-container extract → check → create/skip state machine
// - **SyncRunner**: Initial scan, event loop, resync and shutdown
//
// ## Design Principles
//
// 1. **Provider is the source of truth**: No local record inventory; existence is queried fresh every pass
// 2. **Retry is core-owned**: Providers make one call per invocation; `RetryPolicy` decides the rest
// 3. **Message passing**: Events reach the runner through a stream, resync requests through a channel
// 4. **Fail fast on the event stream**: No reconnect; the supervisor restarts the process
// 5. **Library-First**: The daemon is a thin wiring layer over this crate

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod retry;
pub mod rules;
pub mod runner;
pub mod stats;
pub mod traits;

// Re-export core types for convenience
pub use client::{DnsClient, RecordPresence};
pub use config::{Credentials, EngineConfig, RecordOptions, RetryConfig, SyncConfig};
pub use engine::{Outcome, PassSummary, Reconciler};
pub use error::{Error, Result};
pub use model::{APEX, ContainerObservation, DesiredRecord, Subdomain, Zone};
pub use retry::RetryPolicy;
pub use rules::extract_subdomain;
pub use runner::{ResyncHandle, ResyncReason, ResyncStatus, SyncRunner};
pub use stats::{ReconciliationStats, StatsSnapshot};
pub use traits::{ContainerEventStream, ContainerSource, DnsProvider, IpSource, RecordMetadata};
