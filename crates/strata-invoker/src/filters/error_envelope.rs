//! Fault-to-envelope recovery.

use crate::context::ExceptionContext;
use crate::filter::{ExceptionFilter, Filter};
use crate::options::InvokerOptions;
use http::StatusCode;
use strata_core::{ActionResult, ErrorEnvelope, InvokeError, ObjectResult};

/// Error code for faults that are not pipeline errors.
pub const UNHANDLED_ERROR_CODE: &str = "UNHANDLED_EXCEPTION";

/// Recovers from any unhandled fault with a JSON error envelope.
///
/// The recovery result is an object result, `500 Internal Server Error`
/// unless configured otherwise. Fault messages are only included when
/// details are exposed; otherwise a generic message is used.
///
/// Register it with a low order so that it sits outside more specific
/// exception filters and only sees what they left unhandled.
///
/// # Example
///
/// ```
/// use strata_invoker::filters::ErrorEnvelopeFilter;
/// use strata_invoker::InvokerOptions;
///
/// let filter = ErrorEnvelopeFilter::from_options(&InvokerOptions::development());
/// assert!(filter.exposes_details());
/// ```
#[derive(Debug, Clone)]
pub struct ErrorEnvelopeFilter {
    expose_details: bool,
    status: StatusCode,
}

impl ErrorEnvelopeFilter {
    /// Creates a filter that hides fault messages.
    #[must_use]
    pub fn new() -> Self {
        Self {
            expose_details: false,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Creates a filter configured from invoker options.
    #[must_use]
    pub fn from_options(options: &InvokerOptions) -> Self {
        Self::new().with_exposed_details(options.expose_exception_details)
    }

    /// Sets whether fault messages are included.
    #[must_use]
    pub fn with_exposed_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    /// Sets the recovery status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns `true` if fault messages are included.
    #[must_use]
    pub fn exposes_details(&self) -> bool {
        self.expose_details
    }

    fn envelope(&self, error: &anyhow::Error, request_id: &str) -> ErrorEnvelope {
        match error.downcast_ref::<InvokeError>() {
            Some(invoke) => invoke.to_envelope(Some(request_id), self.expose_details),
            None if self.expose_details => {
                ErrorEnvelope::new(UNHANDLED_ERROR_CODE, error.to_string(), Some(request_id))
            }
            None => ErrorEnvelope::new(
                UNHANDLED_ERROR_CODE,
                "An internal error occurred",
                Some(request_id),
            ),
        }
    }
}

impl Default for ErrorEnvelopeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExceptionFilter for ErrorEnvelopeFilter {
    fn on_exception(&self, ctx: &mut ExceptionContext<'_>) -> anyhow::Result<()> {
        if ctx.exception_handled() {
            return Ok(());
        }
        let Some(error) = ctx.exception() else {
            return Ok(());
        };

        tracing::warn!(error = %error, status = %self.status, "recovering with error envelope");
        let envelope = self.envelope(error, &ctx.request_id().to_string());
        ctx.set_result(ActionResult::Object(
            ObjectResult::new(envelope.to_value()).with_status(self.status),
        ));
        Ok(())
    }
}

impl Filter for ErrorEnvelopeFilter {
    fn name(&self) -> &str {
        "error_envelope"
    }

    fn order(&self) -> i32 {
        -500
    }

    fn as_exception(&self) -> Option<&dyn ExceptionFilter> {
        Some(self)
    }
}
