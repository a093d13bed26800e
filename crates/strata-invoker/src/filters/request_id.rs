//! Request ID propagation.
//!
//! The response always carries an `x-request-id` header so that clients can
//! correlate a response with server logs. By default the ID is the
//! invocation's own [`RequestId`]. When incoming IDs are trusted, a valid
//! UUID in the request's `x-request-id` header is echoed instead.

use crate::context::{ResourceExecutedContext, ResourceExecutingContext};
use crate::filter::{Filter, ResourceFilter};
use http::header::{HeaderName, HeaderValue};
use strata_core::RequestId;
use uuid::Uuid;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Stamps the request ID on every response, including short-circuits.
///
/// # Example
///
/// ```
/// use strata_invoker::filters::RequestIdFilter;
/// use strata_invoker::Filter;
///
/// let filter = RequestIdFilter::trust_incoming();
/// assert_eq!(filter.name(), "request_id");
/// assert!(filter.order() < 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestIdFilter {
    trust_incoming: bool,
}

impl RequestIdFilter {
    /// Creates a filter that always uses the invocation's request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter that echoes a valid incoming `x-request-id`.
    ///
    /// Use this for internal services whose callers already assign IDs.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn incoming(&self, ctx: &ResourceExecutingContext<'_>) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }
        ctx.action_context()
            .header(REQUEST_ID_HEADER)
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(RequestId::from_uuid)
    }
}

impl ResourceFilter for RequestIdFilter {
    fn on_resource_executing(&self, ctx: &mut ResourceExecutingContext<'_>) -> anyhow::Result<()> {
        let request_id = self.incoming(ctx).unwrap_or_else(|| ctx.request_id());
        let value = HeaderValue::try_from(request_id.to_string())?;
        ctx.action_context_mut()
            .response_mut()
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        Ok(())
    }

    fn on_resource_executed(&self, _ctx: &mut ResourceExecutedContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Filter for RequestIdFilter {
    fn name(&self) -> &str {
        "request_id"
    }

    fn order(&self) -> i32 {
        -1000
    }

    fn as_resource(&self) -> Option<&dyn ResourceFilter> {
        Some(self)
    }
}
