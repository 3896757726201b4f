//! Prometheus exporter that scrapes numeric values out of HTML pages.
//!
//! The exporter fetches configured web pages on demand, locates values with
//! CSS selectors, normalizes locale-specific number formatting (thousands
//! and decimal separators), and renders the results in the Prometheus text
//! exposition format.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ HTML pages  │────>│    Collector     │────>│   HTTP server   │
//! │ (HTTP GET)  │     │ (scrape + build) │     │    (/probe)     │
//! └─────────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! Every probe runs one collection pass: each target page is fetched and
//! parsed once, each configured metric extracts and normalizes its value,
//! and failures degrade to NaN-valued samples instead of failing the probe.
//!
//! # Usage
//!
//! Run the exporter binary with a configuration file:
//!
//! ```bash
//! html-exporter --config config.json5
//! ```
//!
//! Prometheus can also pass an ad-hoc target in the probe URL:
//!
//! ```text
//! /probe?target=https://example.com/&selector=div%23price&metric_name=price
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod http;
pub mod metrics;
pub mod normalize;
pub mod scrape;

pub use collector::{Collection, Collector};
pub use config::ExporterConfig;
pub use http::{AppState, HttpServer};
