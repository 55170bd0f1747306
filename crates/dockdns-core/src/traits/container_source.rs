// # Container Source Trait
//
// Defines the interface for discovering running containers and watching
// container start events.
//
// ## Implementations
//
// - Docker Engine API: `dockdns-docker` crate
//
// ## Usage
//
// ```rust,ignore
// use dockdns_core::ContainerSource;
// use tokio_stream::StreamExt;
//
// let running = source.list_running().await?;
//
// let mut starts = source.watch_starts();
// while let Some(observation) = starts.next().await {
//     let observation = observation?; // stream failure is fatal
//     println!("started: {}", observation.name);
// }
// ```

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::model::ContainerObservation;

/// Stream of container start observations
///
/// An `Err` item means the subscription failed; consumers treat it, and the
/// end of the stream, as fatal.
pub type ContainerEventStream =
    Pin<Box<dyn Stream<Item = Result<ContainerObservation, crate::Error>> + Send + 'static>>;

/// Trait for container runtime implementations
///
/// This trait defines two core capabilities:
/// 1. **list_running()**: Snapshot of currently running containers
/// 2. **watch_starts()**: Stream of container start events
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Talk to the container runtime API
/// - ✅ Spawn one task per `watch_starts()` call to pump events into a channel
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS lookups or updates (use `DnsClient`)
/// - ❌ Reconnect silently after the subscription fails
/// - ❌ Decide whether a container needs a record (use `Reconciler`)
#[async_trait]
pub trait ContainerSource: Send + Sync {
    /// List running containers with their labels
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<ContainerObservation>)`: One observation per running container
    /// - `Err(Error)`: If the runtime could not be queried
    async fn list_running(&self) -> Result<Vec<ContainerObservation>, crate::Error>;

    /// Watch container start events
    ///
    /// The runtime filters events server-side to container starts. The
    /// stream yields indefinitely until the connection fails; it never
    /// reconnects on its own.
    fn watch_starts(&self) -> ContainerEventStream;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
