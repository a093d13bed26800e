//! Header-presence authorization.

use crate::context::AuthorizationFilterContext;
use crate::filter::{AuthorizationFilter, Filter};
use http::StatusCode;
use strata_core::ActionResult;

/// Denies requests that lack a header.
///
/// The denial is a bare status result, `401 Unauthorized` unless configured
/// otherwise.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use strata_invoker::filters::RequireHeaderFilter;
///
/// let filter = RequireHeaderFilter::new("x-api-key").with_status(StatusCode::FORBIDDEN);
/// assert_eq!(filter.header(), "x-api-key");
/// assert_eq!(filter.status(), StatusCode::FORBIDDEN);
/// ```
#[derive(Debug, Clone)]
pub struct RequireHeaderFilter {
    header: String,
    status: StatusCode,
}

impl RequireHeaderFilter {
    /// Requires `header` on every request.
    #[must_use]
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    /// Sets the denial status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns the required header.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Returns the denial status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl AuthorizationFilter for RequireHeaderFilter {
    fn on_authorization(&self, ctx: &mut AuthorizationFilterContext<'_>) -> anyhow::Result<()> {
        if ctx.result().is_some() || ctx.action_context().header(&self.header).is_some() {
            return Ok(());
        }
        tracing::info!(header = %self.header, status = %self.status, "required header missing");
        ctx.set_result(ActionResult::status(self.status));
        Ok(())
    }
}

impl Filter for RequireHeaderFilter {
    fn name(&self) -> &str {
        "require_header"
    }

    fn as_authorization(&self) -> Option<&dyn AuthorizationFilter> {
        Some(self)
    }
}
