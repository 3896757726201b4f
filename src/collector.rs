//! On-demand collection: scrape the configured targets and render samples.

use std::collections::BTreeMap;
use std::io::Write;

use reqwest::Client;
use tracing::debug;

use crate::config::{GlobalConfig, TargetConfig};
use crate::metrics::{BuildError, MetricDescriptor, MetricSample, build_sample, describe_metric};
use crate::scrape::{ScrapeWarning, scrape_all};

/// Collects samples for a fixed set of targets.
///
/// Holds read-only state for one collection pass; the probe handler builds
/// a fresh one per request.
pub struct Collector {
    global: GlobalConfig,
    targets: Vec<TargetConfig>,
    client: Client,
}

/// The outcome of one collection pass.
#[derive(Debug)]
pub struct Collection {
    /// One sample per (target, metric) pair, in configuration order.
    pub samples: Vec<MetricSample>,
    /// Targets whose page could not be fetched or parsed.
    pub target_failures: usize,
    /// Metrics whose value could not be extracted or normalized.
    pub metric_failures: usize,
}

impl Collector {
    /// Create a collector over the given targets.
    pub fn new(global: GlobalConfig, targets: Vec<TargetConfig>, client: Client) -> Self {
        Self {
            global,
            targets,
            client,
        }
    }

    /// Describe every configured metric. Never touches the network.
    pub fn describe(&self) -> Vec<MetricDescriptor> {
        self.targets
            .iter()
            .flat_map(|target| {
                target
                    .metrics
                    .iter()
                    .map(|metric| describe_metric(&self.global, metric))
            })
            .collect()
    }

    /// Scrape every target once and build one sample per configured metric.
    ///
    /// Scrape failures degrade to NaN-valued samples. A build error means
    /// the configuration cannot produce valid metrics and fails the pass.
    pub async fn collect(&self) -> Result<Collection, BuildError> {
        debug!(targets = self.targets.len(), "begin collect");

        let reports = scrape_all(&self.client, &self.targets).await;

        let mut samples = Vec::new();
        let mut target_failures = 0;
        let mut metric_failures = 0;

        for (target, report) in self.targets.iter().zip(&reports) {
            if report.failure.is_some() {
                target_failures += 1;
            }

            metric_failures += report
                .warnings
                .iter()
                .filter(|w| matches!(w, ScrapeWarning::MetricFailed { .. }))
                .count();

            for (metric, value) in target.metrics.iter().zip(&report.values) {
                samples.push(build_sample(&self.global, metric, *value)?);
            }
        }

        Ok(Collection {
            samples,
            target_failures,
            metric_failures,
        })
    }
}

/// Render samples in the Prometheus text exposition format.
///
/// Samples are grouped by metric name with one HELP/TYPE comment per
/// group; within a group the samples keep their collection order.
pub fn render(samples: &[MetricSample]) -> String {
    let mut output = Vec::with_capacity(samples.len() * 100);

    let mut by_name: BTreeMap<&str, Vec<&MetricSample>> = BTreeMap::new();
    for sample in samples {
        by_name.entry(&sample.name).or_default().push(sample);
    }

    for (name, group) in &by_name {
        // HELP and TYPE come from the first sample of the group
        let first = group[0];

        if !first.help.is_empty() {
            writeln!(output, "# HELP {} {}", name, escape_help(&first.help)).ok();
        }
        writeln!(output, "# TYPE {} {}", name, first.kind.as_str()).ok();

        for sample in group {
            writeln!(
                output,
                "{}{} {}",
                name,
                format_labels(&sample.labels),
                format_value(sample.value)
            )
            .ok();
        }
    }

    String::from_utf8(output).unwrap_or_default()
}

/// Escape special characters in a HELP comment.
fn escape_help(help: &str) -> String {
    let mut result = String::with_capacity(help.len());
    for c in help.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for the exposition format.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format labels for the exposition format.
fn format_labels(labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
