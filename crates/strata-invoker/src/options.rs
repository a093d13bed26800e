//! Invoker options.

use strata_core::{HttpResultExecutor, DEFAULT_CONTENT_TYPE, DEFAULT_MAX_ALLOWED_ERRORS};

/// Tunables shared by the invoker and the built-in filters.
///
/// # Example
///
/// ```
/// use strata_invoker::InvokerOptions;
///
/// let options = InvokerOptions::production();
/// assert!(!options.expose_exception_details);
///
/// let executor = options.result_executor();
/// assert_eq!(executor.default_content_type(), "text/plain; charset=utf-8");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokerOptions {
    /// Error cap applied to each request's model state.
    pub max_model_state_errors: usize,
    /// Whether error envelopes carry the fault message.
    pub expose_exception_details: bool,
    /// Fallback content type for content results.
    pub default_content_type: String,
    /// Whether to emit pipeline metrics.
    pub record_metrics: bool,
}

impl InvokerOptions {
    /// Options for local development: fault messages are exposed.
    #[must_use]
    pub fn development() -> Self {
        Self {
            expose_exception_details: true,
            ..Self::default()
        }
    }

    /// Options for production: fault messages are hidden.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Builds the default result executor for these options.
    #[must_use]
    pub fn result_executor(&self) -> HttpResultExecutor {
        HttpResultExecutor::new().with_default_content_type(self.default_content_type.clone())
    }
}

impl Default for InvokerOptions {
    fn default() -> Self {
        Self {
            max_model_state_errors: DEFAULT_MAX_ALLOWED_ERRORS,
            expose_exception_details: false,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            record_metrics: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(InvokerOptions::development().expose_exception_details);
        assert_eq!(InvokerOptions::production(), InvokerOptions::default());
    }

    #[test]
    fn test_result_executor_uses_content_type() {
        let options = InvokerOptions {
            default_content_type: "text/markdown".into(),
            ..InvokerOptions::default()
        };
        assert_eq!(options.result_executor().default_content_type(), "text/markdown");
    }
}
