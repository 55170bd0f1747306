// # dockdnsd - container DNS sync daemon
//
// Thin integration layer: all reconciliation logic lives in dockdns-core.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging, metrics and the runtime
// 3. Resolving the public IPv4 address records point at
// 4. Wiring the Cloudflare provider and the Docker source into the runner
// 5. Serving the HTTP surface and handling signals
//
// ## Configuration
//
// - `DOMAIN`: Base domain (required)
// - `CF_DNS_API_TOKEN`: Cloudflare API token, or
// - `CF_API_EMAIL` + `CF_API_KEY`: Cloudflare global key
// - `PUBLIC_IP`: Explicit IPv4 (skips detection)
// - `LOG_LEVEL`: trace, debug, info, warn, error (default info; `RUST_LOG` wins)
// - `LOG_FORMAT`: json or text (default json)
// - `DNS_RECORD_TTL`, `DNS_RECORD_PROXIED`: Created record options
// - `HEALTH_ADDR`: HTTP bind address (default 0.0.0.0:8000)
// - `DNS_SYNC_MODE`: live or dry-run
//
// ## Signals
//
// - `SIGUSR1`: Full rescan, same as `POST /sync`
// - `SIGTERM`, `SIGINT`: Exit 0 without draining in-flight work
//
// ## Example
//
// ```bash
// export DOMAIN=example.com
// export CF_DNS_API_TOKEN=your_token
//
// dockdnsd
// ```

mod config;
mod server;
mod signals;

use anyhow::{Context, Result};
use dockdns_core::traits::{ContainerSource, IpSource};
use dockdns_core::{DnsClient, ReconciliationStats, Reconciler, ResyncHandle, SyncRunner};
use dockdns_docker::DockerContainerSource;
use dockdns_ip_http::HttpIpSource;
use dockdns_provider_cloudflare::CloudflareProvider;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};
use crate::server::AppState;
use crate::signals::Signals;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (event stream failure)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (the runner stopped)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Everything started and ready to run
struct Daemon {
    runner: SyncRunner,
    resync: ResyncHandle,
    http: JoinHandle<()>,
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DaemonExitCode::ConfigError.into();
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("{:#}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!(
        domain = %config.domain,
        credentials = config.credentials.kind(),
        dry_run = config.dry_run,
        "Starting dockdnsd"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        let mut signals = match Signals::install() {
            Ok(signals) => signals,
            Err(e) => {
                error!(error = %format!("{:#}", e), "Startup failed");
                return DaemonExitCode::ConfigError;
            }
        };

        let started = tokio::select! {
            result = start(&config) => result,
            signal = signals.shutdown() => {
                return match signal {
                    Ok(signal) => {
                        info!(signal, "Received shutdown signal during startup, exiting");
                        DaemonExitCode::CleanShutdown
                    }
                    Err(e) => {
                        error!(error = %format!("{:#}", e), "Signal handling failed");
                        DaemonExitCode::RuntimeError
                    }
                };
            }
        };

        let daemon = match started {
            Ok(daemon) => daemon,
            Err(e) => {
                error!(error = %format!("{:#}", e), "Startup failed");
                return DaemonExitCode::ConfigError;
            }
        };
        run(daemon, signals).await
    });

    // In-flight reconciliation is abandoned, not drained
    rt.shutdown_background();
    code.into()
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `LOG_LEVEL`.
fn init_tracing(config: &Config) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log_level.to_lowercase())
            .context("Invalid LOG_LEVEL")?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.log_format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

/// Build every component and start the HTTP surface
///
/// Any failure here is a startup error.
async fn start(config: &Config) -> Result<Daemon> {
    let sync_config = config.to_sync_config();

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;
    server::describe_metrics();

    let ip_source = HttpIpSource::new()?.with_override(sync_config.public_ip);
    let target_ip = ip_source
        .current()
        .await
        .context("Failed to determine public IP")?;
    info!(ip = %target_ip, source = ip_source.source_name(), "Target IP resolved");

    let provider = CloudflareProvider::from_config(&sync_config)?;
    let client = DnsClient::new(
        Arc::new(provider),
        sync_config.normalized_domain(),
        sync_config.retry.policy(),
    );

    let stats = Arc::new(ReconciliationStats::new());
    let reconciler = Arc::new(Reconciler::new(
        client,
        target_ip,
        sync_config.record,
        Arc::clone(&stats),
    ));

    log_existing_records(&reconciler).await;

    let source = DockerContainerSource::connect()?
        .with_channel_capacity(sync_config.engine.event_channel_capacity);
    if let Err(e) = source.ping().await {
        warn!(error = %e, "Docker daemon did not answer ping");
    }
    info!(source = source.source_name(), "Container source ready");

    let (runner, resync) = SyncRunner::new(
        Arc::new(source),
        reconciler,
        sync_config.engine.resync_channel_capacity,
    );

    let listener = TcpListener::bind(config.health_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP surface on {}", config.health_addr))?;
    let state = AppState {
        stats,
        metrics,
        resync: resync.clone(),
    };
    let http = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            error!(error = %e, "HTTP surface stopped");
        }
    });

    Ok(Daemon {
        runner,
        resync,
        http,
    })
}

/// Log how many A records the zone already holds
///
/// Diagnostic only; failures are logged and startup continues.
async fn log_existing_records(reconciler: &Reconciler) {
    let client = reconciler.client();
    match client.list_records().await {
        Ok(records) => info!(
            base_domain = client.base_domain(),
            a_records = records.len(),
            "Zone inspected"
        ),
        Err(e) => warn!(
            base_domain = client.base_domain(),
            error = %e,
            "Failed to list existing records"
        ),
    }
}

/// Run until a shutdown signal or a runner failure
async fn run(daemon: Daemon, mut signals: Signals) -> DaemonExitCode {
    let Daemon {
        runner,
        resync,
        http,
    } = daemon;

    let resync_signal = signals.forward_resync(resync);
    let mut runner_task = tokio::spawn(runner.run());

    let code = tokio::select! {
        result = &mut runner_task => match result {
            Ok(Ok(())) => {
                info!("Sync runner finished");
                DaemonExitCode::CleanShutdown
            }
            Ok(Err(e)) => {
                error!(error = %e, fatal = e.is_fatal(), "Sync runner failed");
                DaemonExitCode::RuntimeError
            }
            Err(e) => {
                error!(error = %e, "Sync runner task panicked");
                DaemonExitCode::RuntimeError
            }
        },

        signal = signals.shutdown() => match signal {
            Ok(signal) => {
                info!(signal, "Received shutdown signal, exiting");
                DaemonExitCode::CleanShutdown
            }
            Err(e) => {
                error!(error = %format!("{:#}", e), "Signal handling failed");
                DaemonExitCode::RuntimeError
            }
        },
    };

    runner_task.abort();
    if let Some(task) = resync_signal {
        task.abort();
    }
    http.abort();
    code
}
