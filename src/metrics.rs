//! Building Prometheus descriptors and samples from scraped values.

use thiserror::Error;

use crate::config::{GlobalConfig, MetricConfig, MetricKind};

/// Value types the exporter can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Gauge,
    Counter,
    Untyped,
}

impl ValueKind {
    /// The TYPE comment string for the exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Gauge => "gauge",
            ValueKind::Counter => "counter",
            ValueKind::Untyped => "untyped",
        }
    }
}

/// Describes one configured metric without scraping anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Fully-qualified metric name (global prefix + configured name).
    pub name: String,
    /// Help text.
    pub help: String,
    /// Label names, sorted.
    pub label_names: Vec<String>,
}

/// One ready-to-render sample.
#[derive(Debug, Clone)]
pub struct MetricSample {
    /// Fully-qualified metric name.
    pub name: String,
    /// Help text.
    pub help: String,
    /// Value type for the TYPE comment.
    pub kind: ValueKind,
    /// Sorted label key-value pairs.
    pub labels: Vec<(String, String)>,
    /// Scraped value; NaN when the scrape failed.
    pub value: f64,
}

/// Errors that make a metric impossible to build.
///
/// These indicate a configuration defect and fail the whole collection,
/// unlike scrape errors which degrade to NaN samples.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("metric type '{kind}' is not implemented")]
    UnsupportedKind { kind: MetricKind },
    #[error("invalid metric name '{name}'")]
    InvalidName { name: String },
    #[error("invalid label name '{label}' for metric '{name}'")]
    InvalidLabel { name: String, label: String },
}

/// Fully qualify a metric name with the configured prefix.
///
/// The prefix is prepended verbatim; no separator is inserted.
fn qualified_name(global: &GlobalConfig, metric: &MetricConfig) -> String {
    format!("{}{}", global.metric_name_prefix, metric.name)
}

/// Describe a configured metric. Never touches the network.
pub fn describe_metric(global: &GlobalConfig, metric: &MetricConfig) -> MetricDescriptor {
    MetricDescriptor {
        name: qualified_name(global, metric),
        help: metric.help.clone(),
        label_names: metric.labels.keys().cloned().collect(),
    }
}

/// Build a sample carrying a scraped value.
///
/// NaN values pass through untouched; they render as explicitly-failed
/// samples rather than being dropped.
pub fn build_sample(
    global: &GlobalConfig,
    metric: &MetricConfig,
    value: f64,
) -> Result<MetricSample, BuildError> {
    let kind = match metric.kind {
        MetricKind::Gauge => ValueKind::Gauge,
        MetricKind::Counter => ValueKind::Counter,
        MetricKind::Untyped => ValueKind::Untyped,
        MetricKind::Histogram | MetricKind::Summary => {
            return Err(BuildError::UnsupportedKind { kind: metric.kind });
        }
    };

    let name = qualified_name(global, metric);
    if !is_valid_metric_name(&name) {
        return Err(BuildError::InvalidName { name });
    }

    for label in metric.labels.keys() {
        if !is_valid_label_name(label) {
            return Err(BuildError::InvalidLabel {
                name: name.clone(),
                label: label.clone(),
            });
        }
    }

    let labels = metric
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(MetricSample {
        name,
        help: metric.help.clone(),
        kind,
        labels,
        value,
    })
}

/// Check a metric name against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Check a label name against `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn make_metric(name: &str, kind: MetricKind) -> MetricConfig {
        MetricConfig {
            name: name.to_string(),
            help: "some help".to_string(),
            kind,
            selector: "div#value".to_string(),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_describe_qualifies_name_with_prefix() {
        let global = GlobalConfig::default();
        let metric = make_metric("article_count", MetricKind::Gauge);

        let desc = describe_metric(&global, &metric);
        assert_eq!(desc.name, "htmlexporter_article_count");
        assert_eq!(desc.help, "some help");
        assert!(desc.label_names.is_empty());
    }

    #[test]
    fn test_describe_label_names_are_sorted() {
        let global = GlobalConfig::default();
        let mut metric = make_metric("m", MetricKind::Gauge);
        metric.labels.insert("zone".to_string(), "a".to_string());
        metric.labels.insert("app".to_string(), "b".to_string());

        let desc = describe_metric(&global, &metric);
        assert_eq!(desc.label_names, vec!["app", "zone"]);
    }

    #[test]
    fn test_build_gauge_sample() {
        let global = GlobalConfig::default();
        let metric = make_metric("article_count", MetricKind::Gauge);

        let sample = build_sample(&global, &metric, 6_592_750.0).unwrap();
        assert_eq!(sample.name, "htmlexporter_article_count");
        assert_eq!(sample.kind, ValueKind::Gauge);
        assert_eq!(sample.value, 6_592_750.0);
    }

    #[test]
    fn test_build_counter_and_untyped_samples() {
        let global = GlobalConfig::default();

        let counter = make_metric("hits", MetricKind::Counter);
        assert_eq!(
            build_sample(&global, &counter, 1.0).unwrap().kind,
            ValueKind::Counter
        );

        let untyped = make_metric("misc", MetricKind::Untyped);
        assert_eq!(
            build_sample(&global, &untyped, 1.0).unwrap().kind,
            ValueKind::Untyped
        );
    }

    #[test]
    fn test_build_summary_is_unsupported() {
        let global = GlobalConfig::default();
        let metric = make_metric("latency", MetricKind::Summary);

        let err = build_sample(&global, &metric, 1.0).unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnsupportedKind {
                kind: MetricKind::Summary
            }
        ));
    }

    #[test]
    fn test_build_histogram_is_unsupported() {
        let global = GlobalConfig::default();
        let metric = make_metric("latency", MetricKind::Histogram);

        let err = build_sample(&global, &metric, 1.0).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedKind { .. }));
    }

    #[test]
    fn test_build_rejects_invalid_metric_name() {
        let global = GlobalConfig::default();
        let metric = make_metric("article-count", MetricKind::Gauge);

        let err = build_sample(&global, &metric, 1.0).unwrap_err();
        assert!(matches!(err, BuildError::InvalidName { .. }));
    }

    #[test]
    fn test_build_rejects_invalid_label_name() {
        let global = GlobalConfig::default();
        let mut metric = make_metric("m", MetricKind::Gauge);
        metric
            .labels
            .insert("bad-label".to_string(), "v".to_string());

        let err = build_sample(&global, &metric, 1.0).unwrap_err();
        assert!(matches!(err, BuildError::InvalidLabel { .. }));
    }

    #[test]
    fn test_build_keeps_nan_value() {
        let global = GlobalConfig::default();
        let metric = make_metric("m", MetricKind::Gauge);

        let sample = build_sample(&global, &metric, f64::NAN).unwrap();
        assert!(sample.value.is_nan());
    }

    #[test]
    fn test_build_labels_are_sorted_pairs() {
        let global = GlobalConfig::default();
        let mut metric = make_metric("m", MetricKind::Gauge);
        metric.labels.insert("zone".to_string(), "eu".to_string());
        metric.labels.insert("app".to_string(), "shop".to_string());

        let sample = build_sample(&global, &metric, 1.0).unwrap();
        assert_eq!(
            sample.labels,
            vec![
                ("app".to_string(), "shop".to_string()),
                ("zone".to_string(), "eu".to_string()),
            ]
        );
    }

    #[test]
    fn test_is_valid_metric_name() {
        assert!(is_valid_metric_name("htmlexporter_article_count"));
        assert!(is_valid_metric_name("_private"));
        assert!(is_valid_metric_name("ns:metric"));
        assert!(!is_valid_metric_name(""));
        assert!(!is_valid_metric_name("9starts_with_digit"));
        assert!(!is_valid_metric_name("has-dash"));
        assert!(!is_valid_metric_name("has space"));
    }

    #[test]
    fn test_is_valid_label_name() {
        assert!(is_valid_label_name("site"));
        assert!(is_valid_label_name("_private"));
        assert!(!is_valid_label_name(""));
        assert!(!is_valid_label_name("9digit"));
        assert!(!is_valid_label_name("no:colons"));
        assert!(!is_valid_label_name("no-dash"));
    }

    #[test]
    fn test_prefix_can_make_an_invalid_name_valid() {
        // "9lives" alone is invalid, but the prefix puts a letter first
        let global = GlobalConfig::default();
        let metric = make_metric("9lives", MetricKind::Gauge);
        assert!(build_sample(&global, &metric, 1.0).is_ok());

        let bare = GlobalConfig {
            metric_name_prefix: String::new(),
            ..GlobalConfig::default()
        };
        assert!(build_sample(&bare, &metric, 1.0).is_err());
    }
}
