//! Prometheus exporter for numeric values scraped from HTML pages.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use html_exporter::config::LogFormat;
use html_exporter::{AppState, ExporterConfig, HttpServer, scrape};

/// Prometheus exporter for numeric values scraped from HTML pages.
#[derive(Parser, Debug)]
#[command(name = "html-exporter")]
#[command(about = "Scrape numeric values out of HTML pages and export them as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error). Overrides config.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // Override listen port from CLI
    if let Some(port) = args.port {
        config.global.port = port;
    }

    // Initialize logging
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.logging.level)
        .parse()
        .unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("html_exporter={}", log_level).parse()?);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!(targets = config.targets.len(), "Starting HTML exporter");

    if args.config.is_none() {
        info!("no config file provided, probe targets come from URL parameters");
    }

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // HTTP client shared by every scrape
    let client = scrape::build_client(&config.global)?;

    let config = Arc::new(config);
    let state = AppState::new(config.clone(), client);

    let listen_addr = SocketAddr::from(([0, 0, 0, 0], config.global.port));
    let http_server = HttpServer::new(state.clone(), listen_addr);

    // Start HTTP server
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).unwrap();
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    // Print final stats
    let stats = state.stats();
    info!(
        probes = stats.probes_total,
        probe_failures = stats.probe_failures_total,
        target_failures = stats.target_failures_total,
        metric_failures = stats.metric_failures_total,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
