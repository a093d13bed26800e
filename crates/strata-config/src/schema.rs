//! Configuration sections.

use serde::{Deserialize, Serialize};
use strata_core::{DEFAULT_CONTENT_TYPE, DEFAULT_MAX_ALLOWED_ERRORS};
use strata_invoker::InvokerOptions;
use strata_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};

const fn default_true() -> bool {
    true
}

fn default_max_model_state_errors() -> usize {
    DEFAULT_MAX_ALLOWED_ERRORS
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Invoker configuration section.
///
/// ```toml
/// [invoker]
/// max_model_state_errors = 200
/// expose_exception_details = false
/// default_content_type = "text/plain; charset=utf-8"
/// record_metrics = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InvokerSection {
    /// Error cap for each request's model state.
    #[serde(default = "default_max_model_state_errors")]
    pub max_model_state_errors: usize,

    /// Include fault messages in error envelopes.
    #[serde(default)]
    pub expose_exception_details: bool,

    /// Fallback content type for content results.
    #[serde(default = "default_content_type")]
    pub default_content_type: String,

    /// Emit pipeline metrics.
    #[serde(default = "default_true")]
    pub record_metrics: bool,
}

impl Default for InvokerSection {
    fn default() -> Self {
        Self {
            max_model_state_errors: default_max_model_state_errors(),
            expose_exception_details: false,
            default_content_type: default_content_type(),
            record_metrics: true,
        }
    }
}

impl InvokerSection {
    /// Converts the section into invoker options.
    #[must_use]
    pub fn to_options(&self) -> InvokerOptions {
        InvokerOptions {
            max_model_state_errors: self.max_model_state_errors,
            expose_exception_details: self.expose_exception_details,
            default_content_type: self.default_content_type.clone(),
            record_metrics: self.record_metrics,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. "info", "strata_invoker=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            include_location: false,
        }
    }
}

impl LoggingSection {
    /// Converts the section into a logging configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            span_events: self.span_events,
            file_line_info: self.include_location,
            include_target: true,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the Prometheus recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Histogram buckets in seconds. Empty means the built-in defaults.
    #[serde(default)]
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_buckets: Vec::new(),
        }
    }
}

impl MetricsSection {
    /// Converts the section into a metrics configuration.
    #[must_use]
    pub fn to_metrics_config(&self) -> MetricsConfig {
        let mut config = MetricsConfig {
            enabled: self.enabled,
            ..MetricsConfig::default()
        };
        if !self.duration_buckets.is_empty() {
            config.duration_buckets.clone_from(&self.duration_buckets);
        }
        config
    }
}

/// Telemetry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl TelemetrySection {
    /// Converts the section into a telemetry configuration.
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            logging: self.logging.to_log_config(),
            metrics: self.metrics.to_metrics_config(),
        }
    }
}
