//! Rejects requests whose bound arguments failed validation.

use crate::context::{ActionExecutedContext, ActionExecutingContext};
use crate::filter::{ActionFilter, Filter};
use http::StatusCode;
use strata_core::{ActionResult, ErrorEnvelope, ObjectResult};

/// Error code used in the rejection envelope.
pub const VALIDATION_ERROR_CODE: &str = "VALIDATION_FAILED";

/// Short-circuits the handler with `400 Bad Request` when model state is
/// invalid.
///
/// The body is an error envelope whose `details` map each key to its errors:
///
/// ```json
/// {
///   "error": {
///     "code": "VALIDATION_FAILED",
///     "message": "One or more validation errors occurred",
///     "details": { "quantity": ["must be positive"] }
///   },
///   "request_id": "..."
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelStateValidationFilter;

impl ModelStateValidationFilter {
    /// Creates the filter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ActionFilter for ModelStateValidationFilter {
    fn on_action_executing(&self, ctx: &mut ActionExecutingContext<'_>) -> anyhow::Result<()> {
        let model_state = ctx.action_context().model_state();
        if model_state.is_valid() {
            return Ok(());
        }

        tracing::info!(errors = model_state.error_count(), "model state invalid");
        let request_id = ctx.request_id().to_string();
        let envelope = ErrorEnvelope::new(
            VALIDATION_ERROR_CODE,
            "One or more validation errors occurred",
            Some(&request_id),
        )
        .with_details(model_state.to_json());

        ctx.set_result(ActionResult::Object(
            ObjectResult::new(envelope.to_value()).with_status(StatusCode::BAD_REQUEST),
        ));
        Ok(())
    }

    fn on_action_executed(&self, _ctx: &mut ActionExecutedContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Filter for ModelStateValidationFilter {
    fn name(&self) -> &str {
        "model_state_validation"
    }

    fn order(&self) -> i32 {
        -2000
    }

    fn as_action(&self) -> Option<&dyn ActionFilter> {
        Some(self)
    }
}
