//! HTTP server exposing the probe and exporter-metrics endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use parking_lot::RwLock;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::collector::{self, Collector};
use crate::config::{ExporterConfig, ProbeParams};
use crate::metrics::{MetricSample, ValueKind};

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ExporterConfig>,
    client: reqwest::Client,
    stats: Arc<RwLock<ExporterStats>>,
}

impl AppState {
    /// Create the shared state.
    pub fn new(config: Arc<ExporterConfig>, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            stats: Arc::new(RwLock::new(ExporterStats::default())),
        }
    }

    /// Snapshot of the exporter counters.
    pub fn stats(&self) -> ExporterStats {
        self.stats.read().clone()
    }
}

/// Counters about the exporter itself, exposed on /metrics.
#[derive(Debug, Clone, Default)]
pub struct ExporterStats {
    /// Probe requests that ran a collection.
    pub probes_total: u64,
    /// Probes that failed with a metric build error.
    pub probe_failures_total: u64,
    /// Targets whose page could not be fetched or parsed.
    pub target_failures_total: u64,
    /// Metrics whose value could not be extracted or normalized.
    pub metric_failures_total: u64,
    /// Duration of the most recent probe.
    pub last_probe_duration_seconds: f64,
}

impl ExporterStats {
    /// Render the counters as samples for the /metrics endpoint.
    ///
    /// These names are fixed; the configurable prefix only applies to
    /// scraped metrics.
    fn to_samples(&self) -> Vec<MetricSample> {
        let sample = |name: &str, help: &str, kind: ValueKind, value: f64| MetricSample {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            labels: Vec::new(),
            value,
        };

        vec![
            sample(
                "htmlexporter_probes_total",
                "Total number of probe requests that ran a collection.",
                ValueKind::Counter,
                self.probes_total as f64,
            ),
            sample(
                "htmlexporter_probe_failures_total",
                "Total number of probes that failed with a metric build error.",
                ValueKind::Counter,
                self.probe_failures_total as f64,
            ),
            sample(
                "htmlexporter_target_failures_total",
                "Total number of targets that could not be fetched or parsed.",
                ValueKind::Counter,
                self.target_failures_total as f64,
            ),
            sample(
                "htmlexporter_metric_failures_total",
                "Total number of metrics that could not be extracted or normalized.",
                ValueKind::Counter,
                self.metric_failures_total as f64,
            ),
            sample(
                "htmlexporter_last_probe_duration_seconds",
                "Duration of the most recent probe in seconds.",
                ValueKind::Gauge,
                self.last_probe_duration_seconds,
            ),
        ]
    }
}

/// Create the HTTP router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/probe", get(probe_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the /probe endpoint.
///
/// With a `target` query parameter the probe scrapes the ad-hoc target
/// described by the URL; otherwise it scrapes every configured target.
async fn probe_handler(
    State(state): State<AppState>,
    Query(params): Query<ProbeParams>,
) -> Response {
    let start = Instant::now();

    let targets = if params.target.is_some() {
        match params.into_target_config() {
            Ok(target) => vec![target],
            Err(e) => {
                warn!(error = %e, "rejecting probe request");
                return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
            }
        }
    } else {
        state.config.targets.clone()
    };

    let collector = Collector::new(state.config.global.clone(), targets, state.client.clone());
    let result = collector.collect().await;

    let duration = start.elapsed().as_secs_f64();
    {
        let mut stats = state.stats.write();
        stats.probes_total += 1;
        stats.last_probe_duration_seconds = duration;
    }

    match result {
        Ok(collection) => {
            {
                let mut stats = state.stats.write();
                stats.target_failures_total += collection.target_failures as u64;
                stats.metric_failures_total += collection.metric_failures as u64;
            }

            debug!(
                duration_seconds = duration,
                samples = collection.samples.len(),
                "scrape of all targets finished"
            );

            (
                StatusCode::OK,
                [("content-type", EXPOSITION_CONTENT_TYPE)],
                collector::render(&collection.samples),
            )
                .into_response()
        }
        Err(e) => {
            {
                let mut stats = state.stats.write();
                stats.probe_failures_total += 1;
            }

            warn!(error = %e, "probe failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Handler for the /metrics endpoint, exposing the exporter's own counters.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let samples = state.stats.read().to_samples();

    (
        StatusCode::OK,
        [("content-type", EXPOSITION_CONTENT_TYPE)],
        collector::render(&samples),
    )
        .into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    state: AppState,
    listen_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(state: AppState, listen_addr: SocketAddr) -> Self {
        Self { state, listen_addr }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.state);

        info!(addr = %self.listen_addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(addr = %self.listen_addr, "HTTP server listening");

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                // Wait for shutdown signal
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
