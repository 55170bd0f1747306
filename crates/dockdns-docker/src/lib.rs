// # Docker Container Source
//
// This crate provides the Docker Engine implementation of `ContainerSource`.
//
// ## Architecture
//
// - `list_running()`: one `GET /containers/json` call, running containers only
// - `watch_starts()`: one `GET /events` subscription filtered server-side to
//   `type=container`, `event=start`, pumped by a single task into a bounded
//   channel that the runner consumes
//
// Start events carry the container's labels as attributes. Events for
// containers that opt into proxy routing are enriched with a
// `GET /containers/{id}/json` call so the observation has the container's
// full label set and name.
//
// ## Failure Semantics
//
// A subscription error is forwarded once as `Error::EventStream` and the
// task exits, ending the stream. There is no reconnect.

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::models::{ContainerInspectResponse, ContainerSummary, EventMessage};
use bollard::system::EventsOptions;
use dockdns_core::rules::routing_enabled;
use dockdns_core::traits::{ContainerEventStream, ContainerSource};
use dockdns_core::{ContainerObservation, Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

/// Default capacity of the event channel
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Docker Engine container source
#[derive(Debug, Clone)]
pub struct DockerContainerSource {
    docker: Docker,
    channel_capacity: usize,
}

impl DockerContainerSource {
    /// Connect using the local defaults (`DOCKER_HOST` or the platform socket)
    ///
    /// # Returns
    ///
    /// - `Ok(DockerContainerSource)`: Client configured (no request made yet)
    /// - `Err(Error::ContainerRuntime)`: The client could not be configured
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::container_runtime(format!("Failed to connect to Docker: {}", e)))?;
        Ok(Self::with_client(docker))
    }

    /// Wrap an existing client
    pub fn with_client(docker: Docker) -> Self {
        Self {
            docker,
            channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    /// Set the event channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Check that the daemon answers
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| Error::container_runtime(format!("Docker ping failed: {}", e)))
    }
}

#[async_trait]
impl ContainerSource for DockerContainerSource {
    async fn list_running(&self) -> Result<Vec<ContainerObservation>> {
        let options = ListContainersOptions::<String> {
            all: false,
            filters: HashMap::from([("status".to_string(), vec!["running".to_string()])]),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| Error::container_runtime(format!("Failed to list containers: {}", e)))?;

        Ok(containers
            .into_iter()
            .filter_map(observation_from_summary)
            .collect())
    }

    fn watch_starts(&self) -> ContainerEventStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let docker = self.docker.clone();

        tokio::spawn(async move {
            tracing::info!("Subscribing to Docker container start events");

            let options = EventsOptions::<String> {
                filters: HashMap::from([
                    ("type".to_string(), vec!["container".to_string()]),
                    ("event".to_string(), vec!["start".to_string()]),
                ]),
                ..Default::default()
            };
            let inspect = |id: String| {
                let docker = docker.clone();
                async move {
                    docker
                        .inspect_container(&id, None::<InspectContainerOptions>)
                        .await
                        .map_err(|e| Error::container_runtime(format!("Inspect failed: {}", e)))
                }
            };

            pump_events(docker.events(Some(options)), inspect, tx).await;
        });

        Box::pin(ReceiverStream::new(rx))
    }

    fn source_name(&self) -> &'static str {
        "docker"
    }
}

/// Forward start events into `tx` until the subscription ends
///
/// A subscription error is sent once as `Error::EventStream` and ends the
/// pump. Dropping the sender closes the channel, which ends the stream the
/// runner holds.
async fn pump_events<S, E, F, Fut>(
    events: S,
    inspect: F,
    tx: mpsc::Sender<Result<ContainerObservation>>,
) where
    S: Stream<Item = std::result::Result<EventMessage, E>>,
    E: std::fmt::Display,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<ContainerInspectResponse>>,
{
    let mut events = std::pin::pin!(events);

    while let Some(event) = events.next().await {
        let item = match event {
            Ok(message) => match observe_start(&inspect, &message).await {
                Some(observation) => Ok(observation),
                None => continue,
            },
            Err(e) => Err(Error::event_stream(format!("Docker event stream failed: {}", e))),
        };

        let failed = item.is_err();
        if tx.send(item).await.is_err() {
            tracing::debug!("Event receiver dropped, stopping Docker event pump");
            return;
        }
        if failed {
            return;
        }
    }

    tracing::warn!("Docker event stream closed by the daemon");
}

/// Turn a start event into an observation
///
/// Routed containers are inspected for their full label set; an inspect
/// failure is logged and the event dropped.
async fn observe_start<F, Fut>(
    inspect: &F,
    message: &EventMessage,
) -> Option<ContainerObservation>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<ContainerInspectResponse>>,
{
    let from_event = observation_from_event(message)?;
    if !routing_enabled(&from_event.labels) {
        return Some(from_event);
    }

    match inspect(from_event.id.clone()).await {
        Ok(details) => observation_from_inspect(details).or(Some(from_event)),
        Err(e) => {
            tracing::warn!(
                container = from_event.display_name(),
                error = %e,
                "Failed to inspect started container, skipping event"
            );
            None
        }
    }
}

/// Container names come back as "/name"
fn strip_name(name: &str) -> String {
    name.trim_start_matches('/').to_string()
}

fn to_labels(labels: Option<HashMap<String, String>>) -> BTreeMap<String, String> {
    labels.unwrap_or_default().into_iter().collect()
}

/// Observation from a `GET /containers/json` entry
pub fn observation_from_summary(summary: ContainerSummary) -> Option<ContainerObservation> {
    let id = summary.id?;
    let name = summary
        .names
        .as_deref()
        .and_then(|names| names.first())
        .map(|n| strip_name(n))
        .unwrap_or_default();

    Some(ContainerObservation {
        id,
        name,
        labels: to_labels(summary.labels),
    })
}

/// Observation from a `GET /containers/{id}/json` response
pub fn observation_from_inspect(details: ContainerInspectResponse) -> Option<ContainerObservation> {
    let id = details.id?;
    let name = details.name.as_deref().map(strip_name).unwrap_or_default();
    let labels = to_labels(details.config.and_then(|config| config.labels));

    Some(ContainerObservation { id, name, labels })
}

/// Observation from an event's actor attributes
///
/// Attributes hold the container labels plus a few engine keys (`name`,
/// `image`); those are kept, as they never match a routing label.
pub fn observation_from_event(message: &EventMessage) -> Option<ContainerObservation> {
    let actor = message.actor.as_ref()?;
    let id = actor.id.clone()?;
    let attributes = actor.attributes.clone().unwrap_or_default();
    let name = attributes
        .get("name")
        .map(|n| strip_name(n))
        .unwrap_or_default();

    Some(ContainerObservation {
        id,
        name,
        labels: attributes.into_iter().collect(),
    })
}
