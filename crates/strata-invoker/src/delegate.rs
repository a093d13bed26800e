//! Continuations handed to asynchronous filters.
//!
//! A delegate represents "the rest of the pipeline" for one filter. It is
//! consumed by [`run`](ResourceExecutionDelegate::run), so it can be invoked
//! at most once, and it borrows the filter's executing context for as long as
//! the returned executed context lives.
//!
//! Calling a delegate after short-circuiting (setting a result, or `cancel`
//! for result filters) is a fatal misuse: the delegate records it, refuses to
//! continue and returns [`InvokeError::InvalidShortCircuit`]. The invocation
//! then ends with that error no matter what the filter does with it.
//!
//! [`InvokeError::InvalidShortCircuit`]: strata_core::InvokeError::InvalidShortCircuit

use crate::context::{
    ActionExecutedContext, ActionExecutingContext, ResourceExecutedContext,
    ResourceExecutingContext, ResultExecutedContext, ResultExecutingContext,
};
use crate::invoker::Pipeline;
use crate::state::InvocationState;
use strata_core::Stage;

fn aborted(state: &InvocationState) -> Option<anyhow::Error> {
    state
        .fatal
        .as_ref()
        .map(|misuse| anyhow::Error::new(misuse.to_error()))
}

/// Continuation for [`AsyncResourceFilter`](crate::AsyncResourceFilter).
pub struct ResourceExecutionDelegate<'a> {
    pipeline: &'a Pipeline<'a>,
    filter: &'a str,
}

impl<'a> ResourceExecutionDelegate<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline<'a>, filter: &'a str) -> Self {
        Self { pipeline, filter }
    }

    /// Runs the rest of the pipeline and returns the executed view.
    ///
    /// # Errors
    ///
    /// Fails if a result was already set on `context`, or if a filter deeper
    /// in the pipeline misused its continuation.
    pub async fn run<'c>(
        self,
        context: &'c mut ResourceExecutingContext<'_>,
    ) -> anyhow::Result<ResourceExecutedContext<'c>> {
        let state = &mut *context.state;
        if state.result.is_some() {
            let error = self
                .pipeline
                .report_misuse(state, Stage::Resource, self.filter, "set a result");
            return Err(error.into());
        }

        self.pipeline.invoke_resource_filter(state).await;
        if let Some(error) = aborted(state) {
            return Err(error);
        }
        Ok(ResourceExecutedContext::new(state))
    }
}

/// Continuation for [`AsyncActionFilter`](crate::AsyncActionFilter).
pub struct ActionExecutionDelegate<'a> {
    pipeline: &'a Pipeline<'a>,
    filter: &'a str,
}

impl<'a> ActionExecutionDelegate<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline<'a>, filter: &'a str) -> Self {
        Self { pipeline, filter }
    }

    /// Runs the remaining action filters and the handler method.
    ///
    /// # Errors
    ///
    /// Fails if a result was already set on `context`, or if a filter deeper
    /// in the pipeline misused its continuation.
    pub async fn run<'c>(
        self,
        context: &'c mut ActionExecutingContext<'_>,
    ) -> anyhow::Result<ActionExecutedContext<'c>> {
        let state = &mut *context.state;
        if state.result.is_some() {
            let error = self
                .pipeline
                .report_misuse(state, Stage::Action, self.filter, "set a result");
            return Err(error.into());
        }

        self.pipeline.invoke_action_filter(state).await;
        if let Some(error) = aborted(state) {
            return Err(error);
        }
        Ok(ActionExecutedContext::new(state))
    }
}

/// Continuation for [`AsyncResultFilter`](crate::AsyncResultFilter).
pub struct ResultExecutionDelegate<'a> {
    pipeline: &'a Pipeline<'a>,
    filter: &'a str,
}

impl<'a> ResultExecutionDelegate<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline<'a>, filter: &'a str) -> Self {
        Self { pipeline, filter }
    }

    /// Runs the remaining result filters and executes the result.
    ///
    /// # Errors
    ///
    /// Fails if `cancel` was already set on `context`, or if a filter deeper
    /// in the pipeline misused its continuation.
    pub async fn run<'c>(
        self,
        context: &'c mut ResultExecutingContext<'_>,
    ) -> anyhow::Result<ResultExecutedContext<'c>> {
        let state = &mut *context.state;
        if state.cancel {
            let error = self
                .pipeline
                .report_misuse(state, Stage::Result, self.filter, "set cancel");
            return Err(error.into());
        }

        self.pipeline.invoke_result_filter(state).await;
        if let Some(error) = aborted(state) {
            return Err(error);
        }
        Ok(ResultExecutedContext::new(state))
    }
}
