// HTTP surface
//
// - `GET /health`: liveness plus the reconciliation counters
// - `GET /metrics`: Prometheus text exposition
// - `POST /sync`: queue a full rescan
//
// Handlers only read counters or offer a resync request, so they never wait
// on reconciliation.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dockdns_core::stats::{
    CONTAINERS_OBSERVED_METRIC, PROVIDER_ERRORS_METRIC, RECORDS_CREATED_METRIC,
};
use dockdns_core::{ReconciliationStats, ResyncHandle, ResyncReason, ResyncStatus};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub stats: Arc<ReconciliationStats>,
    pub metrics: PrometheusHandle,
    pub resync: ResyncHandle,
}

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    metrics::describe_counter!(RECORDS_CREATED_METRIC, "DNS records created");
    metrics::describe_counter!(PROVIDER_ERRORS_METRIC, "Failed DNS provider calls");
    metrics::describe_gauge!(
        CONTAINERS_OBSERVED_METRIC,
        "Containers observed with a routing rule"
    );
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/sync", post(trigger_sync))
        .with_state(state)
}

/// Serve the HTTP surface until the listener fails
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "HTTP surface listening");
    }
    axum::serve(listener, router(state)).await
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "uptime": state.stats.uptime_secs(),
        "stats": state.stats.snapshot(),
    }))
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn trigger_sync(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.resync.request(ResyncReason::Http) {
        ResyncStatus::Queued | ResyncStatus::AlreadyPending => (
            StatusCode::ACCEPTED,
            Json(json!({ "message": "Sync triggered" })),
        ),
        ResyncStatus::RunnerStopped => {
            warn!("Sync requested but the runner has stopped");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": "Sync runner is not running" })),
            )
        }
    }
}
