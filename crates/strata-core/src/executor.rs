//! Result execution.

use crate::context::ActionContext;
use crate::handler::BoxFuture;
use crate::result::{ActionResult, ContentResult, ObjectResult};
use http::StatusCode;

/// Default content type for content results.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Content type written for object results.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Writes the effect of an [`ActionResult`] to the response.
pub trait ResultExecutor: Send + Sync {
    /// Executes `result` against the request context.
    fn execute<'a>(
        &'a self,
        context: &'a mut ActionContext,
        result: &'a ActionResult,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Writes results into the context's [`ResponseBuffer`](crate::ResponseBuffer).
///
/// # Example
///
/// ```
/// use strata_core::{ActionContext, ActionResult, HttpResultExecutor, ResultExecutor, fixtures};
///
/// # tokio_test::block_on(async {
/// let executor = HttpResultExecutor::new();
/// let mut ctx = ActionContext::new(fixtures::unit_action("hello"));
///
/// executor.execute(&mut ctx, &ActionResult::content("hi")).await.unwrap();
/// assert_eq!(ctx.response().body(), b"hi");
/// assert_eq!(ctx.response().content_type(), Some("text/plain; charset=utf-8"));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct HttpResultExecutor {
    default_content_type: String,
}

impl HttpResultExecutor {
    /// Creates an executor using [`DEFAULT_CONTENT_TYPE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// Overrides the fallback content type for content results.
    #[must_use]
    pub fn with_default_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = content_type.into();
        self
    }

    /// Returns the fallback content type.
    #[must_use]
    pub fn default_content_type(&self) -> &str {
        &self.default_content_type
    }

    fn write_content(&self, context: &mut ActionContext, result: &ContentResult) {
        let response = context.response_mut();

        let content_type = result
            .content_type
            .clone()
            .or_else(|| response.content_type().map(ToString::to_string))
            .unwrap_or_else(|| self.default_content_type.clone());
        response.set_content_type(&content_type);

        if let Some(status) = result.status {
            response.set_status(status);
        }
        if let Some(content) = &result.content {
            response.write(content.as_bytes());
        }
    }

    fn write_object(context: &mut ActionContext, result: &ObjectResult) -> anyhow::Result<()> {
        let body = serde_json::to_vec(&result.value)?;
        let response = context.response_mut();
        response.set_status(result.status.unwrap_or(StatusCode::OK));
        response.set_content_type(JSON_CONTENT_TYPE);
        response.write(&body);
        Ok(())
    }
}

impl Default for HttpResultExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultExecutor for HttpResultExecutor {
    fn execute<'a>(
        &'a self,
        context: &'a mut ActionContext,
        result: &'a ActionResult,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            match result {
                ActionResult::Empty => Ok(()),
                ActionResult::Status(status) => {
                    context.response_mut().set_status(*status);
                    Ok(())
                }
                ActionResult::Content(content) => {
                    self.write_content(context, content);
                    Ok(())
                }
                ActionResult::Object(object) => Self::write_object(context, object),
                ActionResult::Custom(custom) => custom.execute(context).await,
            }
        })
    }
}
