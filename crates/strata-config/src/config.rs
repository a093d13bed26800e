//! Root configuration type.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, InvokerSection, LogFormat, TelemetrySection};

/// Complete Strata configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use strata_config::StrataConfig;
///
/// let config = StrataConfig::default();
/// assert_eq!(config.invoker.max_model_state_errors, 200);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// Invoker configuration.
    #[serde(default)]
    pub invoker: InvokerSection,

    /// Telemetry configuration (logging, metrics).
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl StrataConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `invoker.max_model_state_errors` is zero
    /// - `invoker.default_content_type` is empty or not a valid header value
    /// - `telemetry.logging.level` is not a valid filter directive
    /// - `telemetry.metrics.duration_buckets` contains a non-positive value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invoker.max_model_state_errors == 0 {
            return Err(ConfigError::invalid_value(
                "invoker.max_model_state_errors",
                "must be at least 1",
            ));
        }

        let content_type = &self.invoker.default_content_type;
        if content_type.trim().is_empty()
            || http::HeaderValue::from_str(content_type).is_err()
        {
            return Err(ConfigError::invalid_value(
                "invoker.default_content_type",
                format!("not a valid content type: {content_type:?}"),
            ));
        }

        if let Err(e) = strata_telemetry::logging::create_env_filter(&self.telemetry.logging.level)
        {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                e.to_string(),
            ));
        }

        if self
            .telemetry
            .metrics
            .duration_buckets
            .iter()
            .any(|bucket| !bucket.is_finite() || *bucket <= 0.0)
        {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.duration_buckets",
                "buckets must be positive numbers",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, fault messages exposed.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_config::StrataConfig;
    ///
    /// let config = StrataConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// assert!(config.invoker.expose_exception_details);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.invoker.expose_exception_details = true;
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.span_events = true;
        config.telemetry.logging.include_location = true;
        config
    }

    /// Production preset: JSON info logs, fault messages hidden.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.invoker.expose_exception_details = false;
        config.telemetry.logging.level = "info".to_string();
        config.telemetry.logging.format = LogFormat::Json;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(StrataConfig::default().validate().is_ok());
        assert!(StrataConfig::development().validate().is_ok());
        assert!(StrataConfig::production().validate().is_ok());
    }

    #[test]
    fn test_zero_error_cap_rejected() {
        let mut config = StrataConfig::default();
        config.invoker.max_model_state_errors = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "invoker.max_model_state_errors"
        ));
    }

    #[test]
    fn test_bad_content_type_rejected() {
        let mut config = StrataConfig::default();
        config.invoker.default_content_type = "text/plain\n".to_string();
        assert!(config.validate().is_err());

        config.invoker.default_content_type = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = StrataConfig::default();
        config.telemetry.logging.level = "strata=notalevel".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_buckets_rejected() {
        let mut config = StrataConfig::default();
        config.telemetry.metrics.duration_buckets = vec![0.1, -1.0];
        assert!(config.validate().is_err());
    }
}
