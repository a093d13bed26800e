//! Typed configuration for Strata.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`STRATA__SECTION__KEY`)
//! - Strict parsing: unknown fields are rejected
//! - Validation after all layers are applied
//!
//! # Configuration File Format
//!
//! ```toml
//! [invoker]
//! max_model_state_errors = 200
//! expose_exception_details = false
//! default_content_type = "text/plain; charset=utf-8"
//! record_metrics = true
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! duration_buckets = [0.005, 0.05, 0.5, 5.0]
//! ```
//!
//! # Example
//!
//! ```
//! use strata_config::ConfigLoader;
//!
//! let config = ConfigLoader::new().with_development().load().unwrap();
//! let options = config.invoker.to_options();
//! assert!(options.expose_exception_details);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::StrataConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{
    InvokerSection, LogFormat, LoggingSection, MetricsSection, TelemetrySection,
};
