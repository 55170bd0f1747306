//! Service runner
//!
//! Drives the reconciler from a [`ContainerSource`]:
//!
//! 1. One full scan of running containers
//! 2. The start-event stream, one reconciliation per event
//! 3. Full rescans on request, without restarting the stream
//! 4. Exit on shutdown without draining in-flight work
//!
//! All reconciliation happens sequentially on the task that calls
//! [`SyncRunner::run_until`].

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

use crate::engine::{PassSummary, Reconciler};
use crate::error::{Error, Result};
use crate::traits::ContainerSource;

/// Why a full rescan was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    /// `POST /sync` on the HTTP surface
    Http,
    /// Operator signal (SIGUSR1)
    Signal,
}

impl std::fmt::Display for ResyncReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResyncReason::Http => f.write_str("http"),
            ResyncReason::Signal => f.write_str("signal"),
        }
    }
}

/// Result of asking the runner for a rescan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncStatus {
    /// The request was queued
    Queued,
    /// A rescan is already queued; it will cover this request
    AlreadyPending,
    /// The runner has stopped
    RunnerStopped,
}

/// Cloneable handle for requesting full rescans
///
/// Never blocks: requests are offered with `try_send`.
#[derive(Debug, Clone)]
pub struct ResyncHandle {
    tx: mpsc::Sender<ResyncReason>,
}

impl ResyncHandle {
    /// Create a handle and the receiving end a runner consumes
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ResyncReason>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Request a full rescan
    pub fn request(&self, reason: ResyncReason) -> ResyncStatus {
        match self.tx.try_send(reason) {
            Ok(()) => ResyncStatus::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => ResyncStatus::AlreadyPending,
            Err(mpsc::error::TrySendError::Closed(_)) => ResyncStatus::RunnerStopped,
        }
    }
}

/// Service runner
///
/// ## Lifecycle
///
/// 1. Create with [`SyncRunner::new()`], keep the returned [`ResyncHandle`]
/// 2. Start with [`SyncRunner::run()`] or [`SyncRunner::run_until()`]
/// 3. Runs until shutdown, or until the event stream fails
pub struct SyncRunner {
    source: Arc<dyn ContainerSource>,
    reconciler: Arc<Reconciler>,
    resync_rx: mpsc::Receiver<ResyncReason>,
}

impl SyncRunner {
    /// Create a runner
    ///
    /// # Parameters
    ///
    /// - `source`: Container runtime
    /// - `reconciler`: Shared reconciler
    /// - `resync_capacity`: Queued rescans before further requests coalesce
    ///
    /// # Returns
    ///
    /// A tuple of (runner, handle) where the handle requests rescans
    pub fn new(
        source: Arc<dyn ContainerSource>,
        reconciler: Arc<Reconciler>,
        resync_capacity: usize,
    ) -> (Self, ResyncHandle) {
        let (handle, rx) = ResyncHandle::channel(resync_capacity);
        let runner = Self {
            source,
            reconciler,
            resync_rx: rx,
        };
        (runner, handle)
    }

    /// Run until the event stream fails
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run until `shutdown` completes or the event stream fails
    ///
    /// Shutdown is honored at any await point, including in the middle of a
    /// scan or a create retry; the interrupted pass is abandoned.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Shutdown requested
    /// - `Err(Error::EventStream)`: The event stream failed or ended
    pub async fn run_until<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let SyncRunner {
            source,
            reconciler,
            mut resync_rx,
        } = self;
        tokio::pin!(shutdown);

        info!(
            source = source.source_name(),
            provider = reconciler.client().provider_name(),
            base_domain = reconciler.client().base_domain(),
            target_ip = %reconciler.target_ip(),
            "Sync runner started"
        );

        tokio::select! {
            _ = full_scan(source.as_ref(), &reconciler, "startup") => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received during initial scan");
                return Ok(());
            }
        }

        let mut events = source.watch_starts();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    return Ok(());
                }

                Some(reason) = resync_rx.recv() => {
                    info!(reason = %reason, "Resync requested");
                    tokio::select! {
                        _ = full_scan(source.as_ref(), &reconciler, "resync") => {}
                        _ = &mut shutdown => {
                            info!("Shutdown signal received during resync");
                            return Ok(());
                        }
                    }
                }

                item = events.next() => match item {
                    Some(Ok(observation)) => {
                        info!(
                            container = observation.display_name(),
                            "Container started"
                        );
                        tokio::select! {
                            _ = reconciler.reconcile(&observation) => {}
                            _ = &mut shutdown => {
                                info!("Shutdown signal received during reconciliation");
                                return Ok(());
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Container event stream failed");
                        if matches!(e, Error::EventStream(_)) {
                            return Err(e);
                        }
                        return Err(Error::event_stream(e.to_string()));
                    }
                    None => {
                        error!("Container event stream ended");
                        return Err(Error::event_stream("Container event stream ended"));
                    }
                }
            }
        }
    }
}

/// List running containers and reconcile each one
///
/// A failed listing is logged and the scan skipped; it is never fatal.
async fn full_scan(
    source: &dyn ContainerSource,
    reconciler: &Reconciler,
    trigger: &str,
) -> Option<PassSummary> {
    let observations = match source.list_running().await {
        Ok(observations) => observations,
        Err(e) => {
            warn!(trigger, error = %e, "Failed to list running containers, skipping scan");
            return None;
        }
    };

    info!(trigger, containers = observations.len(), "Scanning running containers");
    Some(reconciler.reconcile_all(&observations).await)
}
