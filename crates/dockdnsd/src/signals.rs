// Process signal handling
//
// Handlers are registered once, before any startup I/O, so a signal arriving
// while the daemon is still detecting its IP or reaching Docker never falls
// through to the default action.
//
// - `SIGUSR1`: Full rescan, same as `POST /sync`
// - `SIGTERM`, `SIGINT`: Shutdown

use anyhow::{Context, Result};
use dockdns_core::{ResyncHandle, ResyncReason};
use tokio::task::JoinHandle;
use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Registered signal streams
pub struct Signals {
    #[cfg(unix)]
    terminate: Signal,
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    resync: Option<Signal>,
}

impl Signals {
    /// Register every handler the daemon uses
    #[cfg(unix)]
    pub fn install() -> Result<Self> {
        Ok(Self {
            terminate: signal(SignalKind::terminate())
                .context("Failed to set up SIGTERM handler")?,
            interrupt: signal(SignalKind::interrupt())
                .context("Failed to set up SIGINT handler")?,
            resync: Some(
                signal(SignalKind::user_defined1()).context("Failed to set up SIGUSR1 handler")?,
            ),
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Spawn a task turning every SIGUSR1 into a resync request
    ///
    /// Returns `None` if the stream was already taken.
    #[cfg(unix)]
    pub fn forward_resync(&mut self, resync: ResyncHandle) -> Option<JoinHandle<()>> {
        let mut sigusr1 = self.resync.take()?;
        Some(tokio::spawn(async move {
            while sigusr1.recv().await.is_some() {
                let status = resync.request(ResyncReason::Signal);
                info!(status = ?status, "SIGUSR1 received");
            }
        }))
    }

    #[cfg(not(unix))]
    pub fn forward_resync(&mut self, _resync: ResyncHandle) -> Option<JoinHandle<()>> {
        None
    }

    /// Wait for SIGTERM or SIGINT
    ///
    /// # Returns
    ///
    /// Returns the name of the signal received.
    #[cfg(unix)]
    pub async fn shutdown(&mut self) -> Result<&'static str> {
        let signal = tokio::select! {
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.interrupt.recv() => "SIGINT",
        };
        Ok(signal)
    }

    /// Wait for CTRL-C
    ///
    /// Fallback implementation for non-Unix platforms.
    #[cfg(not(unix))]
    pub async fn shutdown(&mut self) -> Result<&'static str> {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to wait for CTRL-C")?;
        Ok("SIGINT")
    }
}
