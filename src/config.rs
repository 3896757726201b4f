//! Configuration for the HTML exporter.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Exporter-wide settings.
    #[serde(default)]
    pub global: GlobalConfig,

    /// Pages to scrape, in output order.
    #[serde(default)]
    pub targets: Vec<TargetConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Exporter-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Prefix prepended verbatim to every metric name (default: "htmlexporter_").
    #[serde(default = "default_metric_name_prefix")]
    pub metric_name_prefix: String,

    /// Port the HTTP server listens on (default: 9883).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout for each scrape request, in seconds (default: 10).
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,
}

fn default_metric_name_prefix() -> String {
    "htmlexporter_".to_string()
}

fn default_port() -> u16 {
    9883
}

fn default_scrape_timeout() -> u64 {
    10
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            metric_name_prefix: default_metric_name_prefix(),
            port: default_port(),
            scrape_timeout_secs: default_scrape_timeout(),
        }
    }
}

/// One page to scrape and the metrics to extract from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// URL of the page to scrape.
    #[serde(default)]
    pub address: String,

    /// Separator between groups of thousands, removed before number
    /// parsing (default: ",").
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: String,

    /// Separator between the integer and fractional part, rewritten to
    /// "." before number parsing (default: ".").
    #[serde(default = "default_decimal_point_separator")]
    pub decimal_point_separator: String,

    /// Metrics to extract from the page, in output order.
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
}

fn default_thousands_separator() -> String {
    ",".to_string()
}

fn default_decimal_point_separator() -> String {
    ".".to_string()
}

impl TargetConfig {
    /// Fill in default separators where they were left empty.
    ///
    /// Query parameters and explicit empty strings both arrive as "", so
    /// the serde field defaults alone are not enough.
    pub fn apply_defaults(&mut self) {
        if self.thousands_separator.is_empty() {
            self.thousands_separator = default_thousands_separator();
        }

        if self.decimal_point_separator.is_empty() {
            self.decimal_point_separator = default_decimal_point_separator();
        }
    }

    /// Validate the target configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::Validation(
                "target address is required".to_string(),
            ));
        }

        if self.metrics.is_empty() {
            return Err(ConfigError::Validation(format!(
                "target '{}' has no metrics configured",
                self.address
            )));
        }

        for metric in &self.metrics {
            metric.validate()?;
        }

        Ok(())
    }
}

/// One metric extracted from a target page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Metric name, qualified with the global prefix on export.
    #[serde(default)]
    pub name: String,

    /// Help text emitted with the metric.
    #[serde(default)]
    pub help: String,

    /// Metric type (default: untyped).
    #[serde(default, rename = "type")]
    pub kind: MetricKind,

    /// CSS selector locating the element whose text holds the value.
    #[serde(default)]
    pub selector: String,

    /// Fixed labels attached to every sample of this metric.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl MetricConfig {
    /// Validate the metric configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Validation(
                "metric name is required".to_string(),
            ));
        }

        if self.selector.is_empty() {
            return Err(ConfigError::Validation(format!(
                "metric '{}' has no selector configured",
                self.name
            )));
        }

        Ok(())
    }
}

/// Prometheus metric type attached to a configured metric.
///
/// Unknown type strings fall back to [`MetricKind::Untyped`]. Histogram
/// and summary are recognized but rejected when samples are built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum MetricKind {
    Gauge,
    Counter,
    #[default]
    Untyped,
    Histogram,
    Summary,
}

impl From<String> for MetricKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "gauge" => MetricKind::Gauge,
            "counter" => MetricKind::Counter,
            "histogram" => MetricKind::Histogram,
            "summary" => MetricKind::Summary,
            _ => MetricKind::Untyped,
        }
    }
}

impl MetricKind {
    /// Configuration string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Untyped => "untyped",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Probe parameters passed by Prometheus in the scrape URL.
///
/// Mirrors the target configuration one level flatter: one target with one
/// metric. Separators and the metric type fall back to the configuration
/// defaults when absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeParams {
    pub target: Option<String>,
    pub selector: Option<String>,
    pub thousands_separator: Option<String>,
    pub decimal_point_separator: Option<String>,
    pub metric_name: Option<String>,
    pub metric_help: Option<String>,
    pub metric_type: Option<String>,
}

impl ProbeParams {
    /// Build a single-target configuration from the query parameters.
    pub fn into_target_config(self) -> Result<TargetConfig, ConfigError> {
        let mut target = TargetConfig {
            address: self.target.unwrap_or_default(),
            thousands_separator: self.thousands_separator.unwrap_or_default(),
            decimal_point_separator: self.decimal_point_separator.unwrap_or_default(),
            metrics: vec![MetricConfig {
                name: self.metric_name.unwrap_or_default(),
                help: self.metric_help.unwrap_or_default(),
                kind: MetricKind::from(self.metric_type.unwrap_or_default()),
                selector: self.selector.unwrap_or_default(),
                labels: BTreeMap::new(),
            }],
        };

        target.apply_defaults();
        target.validate()?;

        Ok(target)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: ExporterConfig = json5::from_str(content)?;

        for target in &mut config.targets {
            target.apply_defaults();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.global.scrape_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "scrape_timeout_secs must be > 0".to_string(),
            ));
        }

        for target in &self.targets {
            target.validate()?;
        }

        Ok(())
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            targets: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}
