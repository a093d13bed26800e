//! The action invoker.
//!
//! [`ActionInvoker::invoke`] runs one matched action through five stages:
//!
//! ```text
//! Authorization ─► Resource ┬► Exception ┬► Action ┬► bind + handler method
//!                           │            │         └◄ result or fault
//!                           │            └◄ recovery result or fault
//!                           └► Result ─► execute result
//! ```
//!
//! Resource, action and result filters nest: each one wraps everything after
//! it, either through separate before/after hooks or through a continuation.
//! Exception filters react on the way out, innermost first.
//!
//! Faults raised by hooks, binding, the handler or the result executor are
//! caught where they happen, carried in the invocation state and offered to
//! the filters responsible for them. A fault nobody handles is returned to
//! the caller unchanged once the handler instance has been released.

use crate::catalog::FilterCatalog;
use crate::context::{
    ActionExecutedContext, ActionExecutingContext, AuthorizationFilterContext, ExceptionContext,
    ResourceExecutedContext, ResourceExecutingContext, ResultExecutedContext,
    ResultExecutingContext,
};
use crate::cursor::{
    ActionStage, AuthorizationStage, ExceptionStage, ResourceStage, ResultStage, StageFilter,
};
use crate::delegate::{ActionExecutionDelegate, ResourceExecutionDelegate, ResultExecutionDelegate};
use crate::options::InvokerOptions;
use crate::state::{complete, Executed, InvocationState, Misuse};
use std::sync::Arc;
use std::time::Instant;
use strata_core::{
    create_action_result, prepare_arguments, ActionContext, ActionResult, ArgumentBinder,
    BoxFuture, HandlerFactory, InvokeError, ModelState, Response, ResultExecutor, Stage,
    DEFAULT_MAX_ALLOWED_ERRORS,
};
use tracing::Instrument;

/// Runs actions through the filter pipeline.
///
/// The invoker holds no per-request state and is shared across requests.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use strata_core::{fixtures, ActionContext, HttpResultExecutor, NoArgumentBinder, TypeActivatorFactory};
/// use strata_invoker::{ActionInvoker, FilterCatalog};
///
/// # tokio_test::block_on(async {
/// let invoker = ActionInvoker::new(
///     TypeActivatorFactory::<()>::new(),
///     NoArgumentBinder,
///     HttpResultExecutor::new(),
/// );
///
/// let context = ActionContext::new(fixtures::value_action("getAnswer", 42));
/// let response = invoker.invoke(context, Arc::new(FilterCatalog::empty())).await.unwrap();
/// assert_eq!(response.status(), 200);
/// # });
/// ```
pub struct ActionInvoker {
    handler_factory: Arc<dyn HandlerFactory>,
    argument_binder: Arc<dyn ArgumentBinder>,
    result_executor: Arc<dyn ResultExecutor>,
    options: InvokerOptions,
}

impl ActionInvoker {
    /// Creates an invoker from its three collaborators.
    #[must_use]
    pub fn new(
        handler_factory: impl HandlerFactory + 'static,
        argument_binder: impl ArgumentBinder + 'static,
        result_executor: impl ResultExecutor + 'static,
    ) -> Self {
        Self::from_shared(
            Arc::new(handler_factory),
            Arc::new(argument_binder),
            Arc::new(result_executor),
        )
    }

    /// Creates an invoker from already shared collaborators.
    #[must_use]
    pub fn from_shared(
        handler_factory: Arc<dyn HandlerFactory>,
        argument_binder: Arc<dyn ArgumentBinder>,
        result_executor: Arc<dyn ResultExecutor>,
    ) -> Self {
        Self {
            handler_factory,
            argument_binder,
            result_executor,
            options: InvokerOptions::default(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: InvokerOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &InvokerOptions {
        &self.options
    }

    /// Invokes the action described by `context` through `filters`.
    ///
    /// # Errors
    ///
    /// - [`InvokeError::InvalidShortCircuit`] if a filter misused its continuation
    /// - [`InvokeError::NullActionResult`] if the action returned no result and
    ///   no filter handled that
    /// - [`InvokeError::Unhandled`] carrying any other unhandled fault
    pub async fn invoke(
        &self,
        context: ActionContext,
        filters: Arc<FilterCatalog>,
    ) -> Result<Response, InvokeError> {
        let action = context.descriptor().display_name();
        let span = tracing::info_span!(
            "invoke_action",
            action = %action,
            request_id = %context.request_id(),
        );
        let started = Instant::now();

        let mut state = InvocationState::new(self.prepare_context(context), Arc::clone(&filters));
        let pipeline = Pipeline {
            invoker: self,
            filters,
        };
        let outcome = pipeline.run(&mut state).instrument(span.clone()).await;

        if let Some(handler) = state.handler.take() {
            self.handler_factory.release(&state.context, handler);
            tracing::debug!(parent: &span, "handler released");
        }

        let label = match &outcome {
            Ok(()) => {
                tracing::debug!(parent: &span, status = %state.context.response().status(), "action invoked");
                "success"
            }
            Err(error) if error.is_misuse() => "misuse",
            Err(error) => {
                tracing::warn!(parent: &span, error = %error, "action failed with an unhandled fault");
                "unhandled"
            }
        };
        if self.options.record_metrics {
            strata_telemetry::metrics::record_invocation(&action, label, started.elapsed());
        }

        outcome.map(|()| state.context.into_response_buffer().into_response())
    }

    fn prepare_context(&self, context: ActionContext) -> ActionContext {
        let limit = self.options.max_model_state_errors;
        let model_state = context.model_state();
        if model_state.is_valid()
            && model_state.max_allowed_errors() == DEFAULT_MAX_ALLOWED_ERRORS
            && limit != DEFAULT_MAX_ALLOWED_ERRORS
        {
            context.with_model_state(ModelState::with_max_allowed_errors(limit))
        } else {
            context
        }
    }
}

impl std::fmt::Debug for ActionInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionInvoker")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// One invocation's walk through the stages.
///
/// The state record is passed explicitly so that delegates and contexts can
/// reborrow it while the pipeline itself stays shared.
pub(crate) struct Pipeline<'i> {
    invoker: &'i ActionInvoker,
    filters: Arc<FilterCatalog>,
}

impl Pipeline<'_> {
    async fn run(&self, state: &mut InvocationState) -> Result<(), InvokeError> {
        if self.invoke_authorization_filters(state).await? {
            return Ok(());
        }

        state.cursor.reset();
        self.invoke_resource_filter(state).await;
        if let Some(misuse) = &state.fatal {
            return Err(misuse.to_error());
        }

        if state.settle_exception() {
            tracing::info!("resource filter handled fault");
        }
        match state.exception.take() {
            Some(error) => Err(InvokeError::from(error)),
            None => Ok(()),
        }
    }

    /// Runs authorization filters in order. Returns `true` if one denied.
    async fn invoke_authorization_filters(
        &self,
        state: &mut InvocationState,
    ) -> Result<bool, InvokeError> {
        state.cursor.reset();
        while let Some(selected) = state.cursor.next::<AuthorizationStage>(&self.filters) {
            let name = selected.entry.name();
            tracing::debug!(filter = name, "authorization filter");

            let mut context = AuthorizationFilterContext::new(state);
            match selected.filter {
                StageFilter::Sync(filter) => filter.on_authorization(&mut context)?,
                StageFilter::Async(filter) => filter.on_authorization(&mut context).await?,
            }

            if let Some(result) = &state.result {
                tracing::info!(filter = name, result = result.kind(), "authorization filter short-circuited");
                self.record_short_circuit(Stage::Authorization);
                self.invoker
                    .result_executor
                    .execute(&mut state.context, result)
                    .await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub(crate) fn invoke_resource_filter<'s>(
        &'s self,
        state: &'s mut InvocationState,
    ) -> BoxFuture<'s, ()> {
        Box::pin(async move {
            if state.is_aborted() {
                return;
            }
            let Some(selected) = state.cursor.next::<ResourceStage>(&self.filters) else {
                self.invoke_inner_stages(state).await;
                return;
            };

            let name = selected.entry.name();
            match selected.filter {
                StageFilter::Async(filter) => {
                    tracing::debug!(filter = name, "resource filter");
                    let outcome = {
                        let mut context = ResourceExecutingContext::new(state);
                        let next = ResourceExecutionDelegate::new(self, name);
                        filter.on_resource_execution(&mut context, next).await
                    };
                    if state.is_aborted() {
                        return;
                    }
                    match outcome {
                        Err(error) => {
                            state.capture(Stage::Resource, error);
                            complete(&mut state.resource_executed, Executed::Completed);
                        }
                        Ok(()) if state.resource_executed.is_none() => {
                            state.resource_executed = Some(Executed::Canceled);
                            self.short_circuit_resource(state, name).await;
                        }
                        Ok(()) => {}
                    }
                }
                StageFilter::Sync(filter) => {
                    tracing::debug!(filter = name, "resource executing");
                    let before = filter.on_resource_executing(&mut ResourceExecutingContext::new(state));
                    if let Err(error) = before {
                        state.capture(Stage::Resource, error);
                        complete(&mut state.resource_executed, Executed::Completed);
                        return;
                    }
                    if state.result.is_some() {
                        state.resource_executed = Some(Executed::Canceled);
                        self.short_circuit_resource(state, name).await;
                        return;
                    }

                    self.invoke_resource_filter(state).await;
                    if state.is_aborted() {
                        return;
                    }

                    tracing::debug!(filter = name, "resource executed");
                    let after = filter.on_resource_executed(&mut ResourceExecutedContext::new(state));
                    if let Err(error) = after {
                        state.capture(Stage::Resource, error);
                    }
                }
            }
        })
    }

    /// Executes a resource filter's short-circuit result, if it set one.
    async fn short_circuit_resource(&self, state: &mut InvocationState, filter: &str) {
        self.record_short_circuit(Stage::Resource);
        let Some(result) = &state.result else {
            tracing::info!(filter, "resource filter short-circuited without a result");
            return;
        };

        tracing::info!(filter, result = result.kind(), "resource filter short-circuited");
        let outcome = self
            .invoker
            .result_executor
            .execute(&mut state.context, result)
            .await;
        if let Err(error) = outcome {
            state.capture(Stage::Resource, error);
        }
    }

    /// Everything inside the innermost resource filter.
    async fn invoke_inner_stages(&self, state: &mut InvocationState) {
        state.cursor.reset();
        self.invoke_exception_filter(state).await;
        if state.is_aborted() {
            return;
        }

        if let Some(recovery) = state.exception_result.take() {
            tracing::info!(result = recovery.kind(), "executing exception recovery result");
            let outcome = self
                .invoker
                .result_executor
                .execute(&mut state.context, &recovery)
                .await;
            state.result = Some(recovery);
            if let Err(error) = outcome {
                state.capture(Stage::Exception, error);
            }
        } else if state.exception.is_none() {
            self.invoke_result_stage(state).await;
            if state.is_aborted() {
                return;
            }
        }

        complete(&mut state.resource_executed, Executed::Completed);
    }

    fn invoke_exception_filter<'s>(
        &'s self,
        state: &'s mut InvocationState,
    ) -> BoxFuture<'s, ()> {
        Box::pin(async move {
            if state.is_aborted() {
                return;
            }
            let Some(selected) = state.cursor.next::<ExceptionStage>(&self.filters) else {
                self.invoke_action_stage(state).await;
                return;
            };

            // Inner filters react first.
            self.invoke_exception_filter(state).await;
            if state.is_aborted() || state.exception.is_none() {
                return;
            }

            let name = selected.entry.name();
            tracing::debug!(filter = name, "exception filter");
            let outcome = {
                let mut context = ExceptionContext::new(state);
                match selected.filter {
                    StageFilter::Sync(filter) => filter.on_exception(&mut context),
                    StageFilter::Async(filter) => filter.on_exception(&mut context).await,
                }
            };

            match outcome {
                Err(error) => {
                    state.exception_result = None;
                    state.capture(Stage::Exception, error);
                }
                Ok(()) => {
                    if state.exception_result.is_some() {
                        state.exception_handled = true;
                    }
                    if state.settle_exception() {
                        tracing::info!(filter = name, "exception filter handled fault");
                    }
                }
            }
        })
    }

    /// Creates the handler, binds arguments once, then runs action filters.
    async fn invoke_action_stage(&self, state: &mut InvocationState) {
        state.cursor.reset();

        let handler = match self.invoker.handler_factory.create(&state.context) {
            Ok(handler) => handler,
            Err(error) => {
                state.capture(Stage::Action, error);
                return;
            }
        };
        tracing::debug!("handler created");
        let handler = state.handler.insert(handler);

        let bound = self
            .invoker
            .argument_binder
            .bind(&mut state.context, &**handler)
            .await;
        match bound {
            Ok(arguments) => state.arguments = arguments,
            Err(error) => {
                state.capture(Stage::Action, error);
                return;
            }
        }

        self.invoke_action_filter(state).await;
        if state.is_aborted() {
            return;
        }
        if state.settle_exception() {
            tracing::info!("action filter handled fault");
        }
    }

    pub(crate) fn invoke_action_filter<'s>(
        &'s self,
        state: &'s mut InvocationState,
    ) -> BoxFuture<'s, ()> {
        Box::pin(async move {
            if state.is_aborted() {
                return;
            }
            let Some(selected) = state.cursor.next::<ActionStage>(&self.filters) else {
                self.invoke_action_method(state).await;
                return;
            };

            let name = selected.entry.name();
            match selected.filter {
                StageFilter::Async(filter) => {
                    tracing::debug!(filter = name, "action filter");
                    let outcome = {
                        let mut context = ActionExecutingContext::new(state);
                        let next = ActionExecutionDelegate::new(self, name);
                        filter.on_action_execution(&mut context, next).await
                    };
                    if state.is_aborted() {
                        return;
                    }
                    match outcome {
                        Err(error) => {
                            state.capture(Stage::Action, error);
                            complete(&mut state.action_executed, Executed::Completed);
                        }
                        Ok(()) if state.action_executed.is_none() => {
                            tracing::info!(filter = name, "action filter short-circuited");
                            self.record_short_circuit(Stage::Action);
                            state.action_executed = Some(Executed::Canceled);
                        }
                        Ok(()) => {}
                    }
                }
                StageFilter::Sync(filter) => {
                    tracing::debug!(filter = name, "action executing");
                    let before = filter.on_action_executing(&mut ActionExecutingContext::new(state));
                    if let Err(error) = before {
                        state.capture(Stage::Action, error);
                        complete(&mut state.action_executed, Executed::Completed);
                        return;
                    }
                    if state.result.is_some() {
                        tracing::info!(filter = name, "action filter short-circuited");
                        self.record_short_circuit(Stage::Action);
                        state.action_executed = Some(Executed::Canceled);
                        return;
                    }

                    self.invoke_action_filter(state).await;
                    if state.is_aborted() {
                        return;
                    }

                    tracing::debug!(filter = name, "action executed");
                    let after = filter.on_action_executed(&mut ActionExecutedContext::new(state));
                    if let Err(error) = after {
                        state.capture(Stage::Action, error);
                    }
                }
            }
        })
    }

    /// Calls the handler method and normalizes what it returned.
    async fn invoke_action_method(&self, state: &mut InvocationState) {
        let descriptor = state.context.descriptor_arc();
        let action = descriptor.display_name();
        let method = descriptor.method();
        let arguments = prepare_arguments(descriptor.parameters(), &state.arguments);

        tracing::debug!(action = %action, arguments = arguments.len(), "invoking action method");
        let returned = match state.handler.as_deref_mut() {
            Some(handler) => method.call(handler, arguments).await,
            None => Err(anyhow::anyhow!("no handler instance for action '{action}'")),
        };

        let produced = returned.and_then(|value| {
            create_action_result(&method.return_kind(), value, &action).map_err(anyhow::Error::new)
        });
        match produced {
            Ok(result) => {
                tracing::debug!(result = result.kind(), "action method returned");
                state.result = Some(result);
            }
            Err(error) => state.capture(Stage::Action, error),
        }
        complete(&mut state.action_executed, Executed::Completed);
    }

    async fn invoke_result_stage(&self, state: &mut InvocationState) {
        state.cursor.reset();
        state.result.get_or_insert(ActionResult::Empty);

        self.invoke_result_filter(state).await;
        if state.is_aborted() {
            return;
        }
        if state.settle_exception() {
            tracing::info!("result filter handled fault");
        }
    }

    pub(crate) fn invoke_result_filter<'s>(
        &'s self,
        state: &'s mut InvocationState,
    ) -> BoxFuture<'s, ()> {
        Box::pin(async move {
            if state.is_aborted() {
                return;
            }
            let Some(selected) = state.cursor.next::<ResultStage>(&self.filters) else {
                self.execute_result(state).await;
                complete(&mut state.result_executed, Executed::Completed);
                return;
            };

            let name = selected.entry.name();
            match selected.filter {
                StageFilter::Async(filter) => {
                    tracing::debug!(filter = name, "result filter");
                    let outcome = {
                        let mut context = ResultExecutingContext::new(state);
                        let next = ResultExecutionDelegate::new(self, name);
                        filter.on_result_execution(&mut context, next).await
                    };
                    if state.is_aborted() {
                        return;
                    }
                    match outcome {
                        Err(error) => {
                            state.capture(Stage::Result, error);
                            complete(&mut state.result_executed, Executed::Completed);
                        }
                        Ok(()) if state.result_executed.is_none() => {
                            tracing::info!(filter = name, "result filter short-circuited");
                            self.record_short_circuit(Stage::Result);
                            state.result_executed = Some(Executed::Canceled);
                            self.execute_result(state).await;
                        }
                        Ok(()) if state.cancel => {
                            // Already executed by the continuation.
                            tracing::info!(filter = name, "result filter canceled after continuing");
                            state.result_executed = Some(Executed::Canceled);
                        }
                        Ok(()) => {}
                    }
                }
                StageFilter::Sync(filter) => {
                    tracing::debug!(filter = name, "result executing");
                    let before = filter.on_result_executing(&mut ResultExecutingContext::new(state));
                    if let Err(error) = before {
                        state.capture(Stage::Result, error);
                        complete(&mut state.result_executed, Executed::Completed);
                        return;
                    }
                    if state.cancel {
                        tracing::info!(filter = name, "result filter canceled");
                        self.record_short_circuit(Stage::Result);
                        state.result_executed = Some(Executed::Canceled);
                        self.execute_result(state).await;
                        return;
                    }

                    self.invoke_result_filter(state).await;
                    if state.is_aborted() {
                        return;
                    }

                    tracing::debug!(filter = name, "result executed");
                    let after = filter.on_result_executed(&mut ResultExecutedContext::new(state));
                    if let Err(error) = after {
                        state.capture(Stage::Result, error);
                    }
                }
            }
        })
    }

    /// Executes the current result, or the empty result if none was produced.
    async fn execute_result(&self, state: &mut InvocationState) {
        let result = state.result.get_or_insert(ActionResult::Empty);
        tracing::debug!(result = result.kind(), "executing result");
        let outcome = self
            .invoker
            .result_executor
            .execute(&mut state.context, result)
            .await;
        if let Err(error) = outcome {
            state.capture(Stage::Result, error);
        }
    }

    /// Records a misuse as fatal and returns the error handed to the filter.
    pub(crate) fn report_misuse(
        &self,
        state: &mut InvocationState,
        stage: Stage,
        filter: &str,
        signal: &'static str,
    ) -> InvokeError {
        let misuse = Misuse::new(stage, filter, signal);
        let error = misuse.to_error();
        tracing::error!(stage = %stage, filter, signal, "{error}");
        state.fatal.get_or_insert(misuse);
        error
    }

    fn record_short_circuit(&self, stage: Stage) {
        if self.invoker.options.record_metrics {
            strata_telemetry::metrics::record_short_circuit(stage.name());
        }
    }
}
