//! Fetching HTML pages and scraping numeric values out of them.
//!
//! A scrape walks the configured targets in order. The page for each target
//! is fetched and parsed once, then every configured metric extracts its
//! value with a CSS selector and normalizes it. Failures never abort the
//! pass: a failed target keeps an all-NaN value row, a failed metric keeps
//! its NaN slot, and both are reported as structured warnings.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{GlobalConfig, TargetConfig};
use crate::normalize::{self, NormalizeError};

/// User agent advertised on every scrape request.
pub const USER_AGENT: &str = concat!("html-exporter/", env!("CARGO_PKG_VERSION"));

/// Errors raised while fetching a target page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid target URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unable to request URL {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request error: {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Error raised when the response body cannot be read.
#[derive(Debug, Error)]
#[error("error reading the response body: {source}")]
pub struct ParseError {
    #[source]
    pub source: reqwest::Error,
}

/// A target-level failure: the page could not be fetched or parsed at all.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors raised while evaluating a selector against a parsed document.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("error parsing the CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("no elements returned by the CSS selector '{selector}'")]
    NoMatch { selector: String },
}

/// A metric-level failure: the value could not be extracted or normalized.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Non-fatal events recorded during a scrape.
///
/// Callers that need more than log output (tests, failure counters) read
/// these off the report.
#[derive(Debug)]
pub enum ScrapeWarning {
    /// A selector matched more than one element; the first match was used.
    AmbiguousSelector {
        metric: String,
        selector: String,
        matched: usize,
    },
    /// A metric failed to extract or normalize; its slot stays NaN.
    MetricFailed {
        metric: String,
        selector: String,
        error: MetricError,
    },
}

/// The outcome of scraping one target.
///
/// `values` always holds one entry per configured metric, in configuration
/// order. Failed metrics keep their NaN slot.
#[derive(Debug)]
pub struct TargetReport {
    pub values: Vec<f64>,
    pub warnings: Vec<ScrapeWarning>,
    pub failure: Option<TargetError>,
}

/// The text content extracted for one selector.
#[derive(Debug)]
struct Selection {
    /// Concatenated descendant text of the first matching element, trimmed.
    text: String,
    /// How many elements the selector matched.
    matched: usize,
}

/// Build the HTTP client shared by every scrape.
pub fn build_client(global: &GlobalConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(global.scrape_timeout_secs))
        .build()
}

/// Fetch a target page with a single GET request. No retries.
async fn fetch(client: &Client, address: &str) -> Result<reqwest::Response, FetchError> {
    let url = url::Url::parse(address).map_err(|source| FetchError::InvalidUrl {
        url: address.to_string(),
        source,
    })?;

    info!(url = %url, "scraping page");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: address.to_string(),
            source,
        })?;

    let status = response.status();
    if !(200..400).contains(&status.as_u16()) {
        return Err(FetchError::Status {
            url: address.to_string(),
            status,
        });
    }

    Ok(response)
}

/// Extract the value text for one selector.
///
/// Only the first match is used; the match count lets the caller flag
/// ambiguous selectors.
fn select_value(document: &Html, selector: &str) -> Result<Selection, QueryError> {
    let parsed = Selector::parse(selector).map_err(|e| QueryError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })?;

    let mut matches = document.select(&parsed);
    let Some(first) = matches.next() else {
        return Err(QueryError::NoMatch {
            selector: selector.to_string(),
        });
    };

    let text = first.text().collect::<String>().trim().to_string();
    let matched = 1 + matches.count();

    Ok(Selection { text, matched })
}

/// Scrape every metric configured for one target.
pub async fn scrape_target(client: &Client, target: &TargetConfig) -> TargetReport {
    // NaN slots keep failed metrics at their position in the output
    let mut values = vec![f64::NAN; target.metrics.len()];
    let mut warnings = Vec::new();

    let response = match fetch(client, &target.address).await {
        Ok(response) => response,
        Err(e) => {
            return TargetReport {
                values,
                warnings,
                failure: Some(e.into()),
            };
        }
    };

    let body = match response.text().await {
        Ok(body) => body,
        Err(source) => {
            return TargetReport {
                values,
                warnings,
                failure: Some(ParseError { source }.into()),
            };
        }
    };

    let document = Html::parse_document(&body);

    for (slot, metric) in values.iter_mut().zip(&target.metrics) {
        debug!(
            metric = %metric.name,
            selector = %metric.selector,
            "scraping value with CSS selector"
        );

        let selection = match select_value(&document, &metric.selector) {
            Ok(selection) => selection,
            Err(e) => {
                warn!(
                    metric = %metric.name,
                    selector = %metric.selector,
                    error = %e,
                    "error scraping value"
                );
                warnings.push(ScrapeWarning::MetricFailed {
                    metric: metric.name.clone(),
                    selector: metric.selector.clone(),
                    error: e.into(),
                });
                continue;
            }
        };

        if selection.matched > 1 {
            warn!(
                metric = %metric.name,
                selector = %metric.selector,
                matched = selection.matched,
                "selector matched more than one element, exporting the first"
            );
            warnings.push(ScrapeWarning::AmbiguousSelector {
                metric: metric.name.clone(),
                selector: metric.selector.clone(),
                matched: selection.matched,
            });
        }

        match normalize::normalize(
            &selection.text,
            &target.thousands_separator,
            &target.decimal_point_separator,
        ) {
            Ok(value) => {
                debug!(metric = %metric.name, value, "scraped value");
                *slot = value;
            }
            Err(e) => {
                warn!(
                    metric = %metric.name,
                    selector = %metric.selector,
                    error = %e,
                    "error normalizing scraped value"
                );
                warnings.push(ScrapeWarning::MetricFailed {
                    metric: metric.name.clone(),
                    selector: metric.selector.clone(),
                    error: e.into(),
                });
            }
        }
    }

    TargetReport {
        values,
        warnings,
        failure: None,
    }
}

/// Scrape every target in order.
///
/// Always returns one report per target, positionally aligned with the
/// input. A target that cannot be fetched keeps its all-NaN value row and
/// carries the failure on its report.
pub async fn scrape_all(client: &Client, targets: &[TargetConfig]) -> Vec<TargetReport> {
    let mut reports = Vec::with_capacity(targets.len());

    for target in targets {
        let report = scrape_target(client, target).await;

        if let Some(e) = &report.failure {
            warn!(address = %target.address, error = %e, "error scraping target");
        }

        reports.push(report);
    }

    reports
}
