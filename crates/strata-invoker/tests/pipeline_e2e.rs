//! End-to-end tests for the action invocation pipeline.
//!
//! Every test drives a full `ActionInvoker::invoke` call with recording
//! collaborators and asserts on the observable sequence of hooks, the
//! results handed to the executor and the handler lifecycle.

use http::StatusCode;
use std::sync::Arc;
use strata_core::fixtures::{
    self, CountingHandlerFactory, EventLog, InvalidOperation, RecordingResultExecutor,
};
use strata_core::{
    ActionContext, ActionResult, BoxFuture, InvokeError, ModelState, NoArgumentBinder, RequestId,
    Stage,
};
use strata_invoker::filters::{
    ErrorEnvelopeFilter, FnAuthorizationFilter, FnExceptionFilter, ModelStateValidationFilter,
    RequestIdFilter, RequireHeaderFilter, TimingFilter, REQUEST_ID_HEADER, UNHANDLED_ERROR_CODE,
    VALIDATION_ERROR_CODE,
};
use strata_invoker::{
    ActionExecutedContext, ActionExecutingContext, ActionExecutionDelegate, ActionFilter,
    ActionInvoker, AsyncActionFilter, AsyncResourceFilter, AsyncResultFilter,
    AuthorizationFilter, AuthorizationFilterContext, ExceptionContext, ExceptionFilter, Filter,
    FilterCatalog, InvokerOptions, Middleware, MiddlewareFilter, MiddlewareNext,
    ResourceExecutedContext, ResourceExecutingContext, ResourceExecutionDelegate, ResourceFilter,
    ResultExecutedContext, ResultExecutingContext, ResultExecutionDelegate, ResultFilter,
};

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    log: EventLog,
    factory: CountingHandlerFactory,
    executor: RecordingResultExecutor,
    options: InvokerOptions,
}

impl Harness {
    fn new() -> Self {
        Self::with_executor(RecordingResultExecutor::new())
    }

    fn with_executor(executor: RecordingResultExecutor) -> Self {
        let log = EventLog::new();
        Self {
            factory: CountingHandlerFactory::new().with_log(log.clone()),
            executor: executor.with_log(log.clone()),
            log,
            options: InvokerOptions {
                record_metrics: false,
                ..InvokerOptions::default()
            },
        }
    }

    fn invoker(&self) -> ActionInvoker {
        ActionInvoker::new(self.factory.clone(), NoArgumentBinder, self.executor.clone())
            .with_options(self.options.clone())
    }

    async fn invoke(
        &self,
        context: ActionContext,
        catalog: FilterCatalog,
    ) -> Result<strata_core::Response, InvokeError> {
        self.invoker().invoke(context, Arc::new(catalog)).await
    }

    fn events(&self) -> Vec<String> {
        self.log.events()
    }
}

fn executed_suffix(canceled: bool, fault: bool) -> &'static str {
    match (canceled, fault) {
        (true, true) => "(canceled,fault)",
        (true, false) => "(canceled)",
        (false, true) => "(fault)",
        (false, false) => "",
    }
}

/// A sync filter that logs every hook of one stage.
struct Recorder {
    name: &'static str,
    stage: Stage,
    log: EventLog,
}

impl Recorder {
    fn new(name: &'static str, stage: Stage, log: &EventLog) -> Self {
        Self {
            name,
            stage,
            log: log.clone(),
        }
    }

    fn push(&self, hook: &str) {
        self.log.push(format!("{}:{hook}", self.name));
    }
}

impl AuthorizationFilter for Recorder {
    fn on_authorization(&self, _ctx: &mut AuthorizationFilterContext<'_>) -> anyhow::Result<()> {
        self.push("authorization");
        Ok(())
    }
}

impl ResourceFilter for Recorder {
    fn on_resource_executing(&self, _ctx: &mut ResourceExecutingContext<'_>) -> anyhow::Result<()> {
        self.push("executing");
        Ok(())
    }

    fn on_resource_executed(&self, ctx: &mut ResourceExecutedContext<'_>) -> anyhow::Result<()> {
        let suffix = executed_suffix(ctx.canceled(), ctx.exception().is_some());
        self.push(&format!("executed{suffix}"));
        Ok(())
    }
}

impl ExceptionFilter for Recorder {
    fn on_exception(&self, _ctx: &mut ExceptionContext<'_>) -> anyhow::Result<()> {
        self.push("exception");
        Ok(())
    }
}

impl ActionFilter for Recorder {
    fn on_action_executing(&self, _ctx: &mut ActionExecutingContext<'_>) -> anyhow::Result<()> {
        self.push("executing");
        Ok(())
    }

    fn on_action_executed(&self, ctx: &mut ActionExecutedContext<'_>) -> anyhow::Result<()> {
        let suffix = executed_suffix(ctx.canceled(), ctx.exception().is_some());
        self.push(&format!("executed{suffix}"));
        Ok(())
    }
}

impl ResultFilter for Recorder {
    fn on_result_executing(&self, _ctx: &mut ResultExecutingContext<'_>) -> anyhow::Result<()> {
        self.push("executing");
        Ok(())
    }

    fn on_result_executed(&self, ctx: &mut ResultExecutedContext<'_>) -> anyhow::Result<()> {
        let suffix = executed_suffix(ctx.canceled(), ctx.exception().is_some());
        self.push(&format!("executed{suffix}"));
        Ok(())
    }
}

impl Filter for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn as_authorization(&self) -> Option<&dyn AuthorizationFilter> {
        (self.stage == Stage::Authorization).then_some(self as &dyn AuthorizationFilter)
    }

    fn as_resource(&self) -> Option<&dyn ResourceFilter> {
        (self.stage == Stage::Resource).then_some(self as &dyn ResourceFilter)
    }

    fn as_exception(&self) -> Option<&dyn ExceptionFilter> {
        (self.stage == Stage::Exception).then_some(self as &dyn ExceptionFilter)
    }

    fn as_action(&self) -> Option<&dyn ActionFilter> {
        (self.stage == Stage::Action).then_some(self as &dyn ActionFilter)
    }

    fn as_result(&self) -> Option<&dyn ResultFilter> {
        (self.stage == Stage::Result).then_some(self as &dyn ResultFilter)
    }
}

/// An async resource filter that logs around its continuation.
struct AroundResource {
    log: EventLog,
}

impl AsyncResourceFilter for AroundResource {
    fn on_resource_execution<'a>(
        &'a self,
        ctx: &'a mut ResourceExecutingContext<'_>,
        next: ResourceExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.push("around:before");
            let executed = next.run(ctx).await?;
            self.log.push(format!(
                "around:after{}",
                executed_suffix(executed.canceled(), executed.exception().is_some())
            ));
            Ok(())
        })
    }
}

impl Filter for AroundResource {
    fn name(&self) -> &str {
        "around"
    }

    fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
        Some(self)
    }
}

/// Short-circuits the resource stage from its executing hook.
struct DenyResource(StatusCode);

impl ResourceFilter for DenyResource {
    fn on_resource_executing(&self, ctx: &mut ResourceExecutingContext<'_>) -> anyhow::Result<()> {
        ctx.set_result(ActionResult::status(self.0));
        Ok(())
    }

    fn on_resource_executed(&self, _ctx: &mut ResourceExecutedContext<'_>) -> anyhow::Result<()> {
        panic!("executed hook of a short-circuiting filter must not run");
    }
}

impl Filter for DenyResource {
    fn name(&self) -> &str {
        "deny_resource"
    }

    fn as_resource(&self) -> Option<&dyn ResourceFilter> {
        Some(self)
    }
}

/// Marks any fault seen after the pipeline ran as handled.
struct AbsorbFaults {
    log: EventLog,
}

impl ResourceFilter for AbsorbFaults {
    fn on_resource_executing(&self, _ctx: &mut ResourceExecutingContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_resource_executed(&self, ctx: &mut ResourceExecutedContext<'_>) -> anyhow::Result<()> {
        if let Some(error) = ctx.exception() {
            self.log.push(format!("absorb:{error}"));
            ctx.set_exception_handled(true);
        }
        Ok(())
    }
}

impl Filter for AbsorbFaults {
    fn name(&self) -> &str {
        "absorb"
    }

    fn as_resource(&self) -> Option<&dyn ResourceFilter> {
        Some(self)
    }
}

/// Sets a response header before the handler runs.
struct SetHeader;

impl ActionFilter for SetHeader {
    fn on_action_executing(&self, ctx: &mut ActionExecutingContext<'_>) -> anyhow::Result<()> {
        ctx.action_context_mut()
            .response_mut()
            .headers_mut()
            .insert("x-action", http::HeaderValue::from_static("seen"));
        Ok(())
    }

    fn on_action_executed(&self, _ctx: &mut ActionExecutedContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Filter for SetHeader {
    fn name(&self) -> &str {
        "set_header"
    }

    fn as_action(&self) -> Option<&dyn ActionFilter> {
        Some(self)
    }
}

/// Cancels the result filter chain.
struct CancelResult;

impl ResultFilter for CancelResult {
    fn on_result_executing(&self, ctx: &mut ResultExecutingContext<'_>) -> anyhow::Result<()> {
        ctx.set_cancel(true);
        Ok(())
    }

    fn on_result_executed(&self, _ctx: &mut ResultExecutedContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Filter for CancelResult {
    fn name(&self) -> &str {
        "cancel_result"
    }

    fn as_result(&self) -> Option<&dyn ResultFilter> {
        Some(self)
    }
}

// Async filters that signal "stop" and then call their continuation anyway.

struct ResourceMisuse {
    swallow: bool,
}

impl AsyncResourceFilter for ResourceMisuse {
    fn on_resource_execution<'a>(
        &'a self,
        ctx: &'a mut ResourceExecutingContext<'_>,
        next: ResourceExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.set_result(ActionResult::status(StatusCode::CONFLICT));
            let continued = next.run(ctx).await;
            if self.swallow {
                return Ok(());
            }
            continued.map(drop)
        })
    }
}

impl Filter for ResourceMisuse {
    fn name(&self) -> &str {
        "resource_misuse"
    }

    fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
        Some(self)
    }
}

struct ActionMisuse;

impl AsyncActionFilter for ActionMisuse {
    fn on_action_execution<'a>(
        &'a self,
        ctx: &'a mut ActionExecutingContext<'_>,
        next: ActionExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.set_result(ActionResult::content("early"));
            next.run(ctx).await?;
            Ok(())
        })
    }
}

impl Filter for ActionMisuse {
    fn name(&self) -> &str {
        "action_misuse"
    }

    fn as_async_action(&self) -> Option<&dyn AsyncActionFilter> {
        Some(self)
    }
}

struct ResultMisuse;

impl AsyncResultFilter for ResultMisuse {
    fn on_result_execution<'a>(
        &'a self,
        ctx: &'a mut ResultExecutingContext<'_>,
        next: ResultExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.set_cancel(true);
            next.run(ctx).await?;
            Ok(())
        })
    }
}

impl Filter for ResultMisuse {
    fn name(&self) -> &str {
        "result_misuse"
    }

    fn as_async_result(&self) -> Option<&dyn AsyncResultFilter> {
        Some(self)
    }
}

/// An async result filter that returns without calling its continuation.
struct SkipResultExecution;

impl AsyncResultFilter for SkipResultExecution {
    fn on_result_execution<'a>(
        &'a self,
        ctx: &'a mut ResultExecutingContext<'_>,
        _next: ResultExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.set_result(ActionResult::content("replaced"));
            Ok(())
        })
    }
}

impl Filter for SkipResultExecution {
    fn name(&self) -> &str {
        "skip_result"
    }

    fn as_async_result(&self) -> Option<&dyn AsyncResultFilter> {
        Some(self)
    }
}

/// An async result filter that continues and then sets `cancel`.
struct CancelAfterContinuing;

impl AsyncResultFilter for CancelAfterContinuing {
    fn on_result_execution<'a>(
        &'a self,
        ctx: &'a mut ResultExecutingContext<'_>,
        next: ResultExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            next.run(ctx).await?;
            ctx.set_cancel(true);
            Ok(())
        })
    }
}

impl Filter for CancelAfterContinuing {
    fn name(&self) -> &str {
        "cancel_after"
    }

    fn as_async_result(&self) -> Option<&dyn AsyncResultFilter> {
        Some(self)
    }
}

struct Maintenance;

impl Middleware for Maintenance {
    fn name(&self) -> &'static str {
        "maintenance"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ResourceExecutingContext<'_>,
        _next: MiddlewareNext<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            ctx.set_result(ActionResult::status(StatusCode::SERVICE_UNAVAILABLE));
            Ok(())
        })
    }
}

struct Trace {
    name: &'static str,
    log: EventLog,
}

impl Middleware for Trace {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut ResourceExecutingContext<'_>,
        next: MiddlewareNext<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.log.push(format!("{}:in", self.name));
            next.run(ctx).await?;
            self.log.push(format!("{}:out", self.name));
            Ok(())
        })
    }
}

fn assert_misuse(err: &InvokeError, expected_stage: Stage, expected_filter: &str) {
    match err {
        InvokeError::InvalidShortCircuit { stage, filter, .. } => {
            assert_eq!(*stage, expected_stage);
            assert_eq!(filter, expected_filter);
        }
        other => panic!("expected misuse, got {other:?}"),
    }
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test]
async fn test_stage_order_with_every_filter_kind() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(Recorder::new("auth", Stage::Authorization, &h.log))
        .filter(Recorder::new("outer", Stage::Resource, &h.log))
        .filter(Recorder::new("inner", Stage::Resource, &h.log))
        .filter(Recorder::new("exc", Stage::Exception, &h.log))
        .filter(Recorder::new("act", Stage::Action, &h.log))
        .filter(Recorder::new("res", Stage::Result, &h.log))
        .build();

    h.invoke(ActionContext::new(fixtures::value_action("getAnswer", 42)), catalog)
        .await
        .unwrap();

    assert_eq!(
        h.events(),
        vec![
            "auth:authorization",
            "outer:executing",
            "inner:executing",
            "handler.create",
            "act:executing",
            "act:executed",
            "res:executing",
            "result.execute:object",
            "res:executed",
            "inner:executed",
            "outer:executed",
            "handler.release",
        ]
    );
}

#[tokio::test]
async fn test_async_resource_filter_wraps_inner_stages() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(AroundResource { log: h.log.clone() })
        .filter(Recorder::new("act", Stage::Action, &h.log))
        .build();

    h.invoke(ActionContext::new(fixtures::unit_action("ping")), catalog)
        .await
        .unwrap();

    assert_eq!(
        h.events(),
        vec![
            "around:before",
            "handler.create",
            "act:executing",
            "act:executed",
            "result.execute:empty",
            "around:after",
            "handler.release",
        ]
    );
}

#[tokio::test]
async fn test_value_scenario_wraps_answer_and_executes_once() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(FnAuthorizationFilter::new("allow", |_ctx| Ok(())))
        .filter(Recorder::new("logs", Stage::Resource, &h.log))
        .filter(SetHeader)
        .filter(Recorder::new("noop", Stage::Result, &h.log))
        .build();

    let response = h
        .invoke(ActionContext::new(fixtures::value_action("getAnswer", 42)), catalog)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-action"], "seen");
    match h.executor.executed().as_slice() {
        [ActionResult::Object(object)] => {
            assert_eq!(object.value, 42);
            assert_eq!(object.declared_type.as_deref(), Some("i32"));
        }
        other => panic!("unexpected executions {other:?}"),
    }
    assert_eq!(
        h.events(),
        vec![
            "logs:executing",
            "handler.create",
            "noop:executing",
            "result.execute:object",
            "noop:executed",
            "logs:executed",
            "handler.release",
        ]
    );
}

// =============================================================================
// Short-circuits
// =============================================================================

#[tokio::test]
async fn test_authorization_denial_skips_everything_else() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(FnAuthorizationFilter::new("deny", |ctx| {
            ctx.set_result(ActionResult::status(StatusCode::FORBIDDEN));
            Ok(())
        }))
        .filter(Recorder::new("later_auth", Stage::Authorization, &h.log))
        .filter(Recorder::new("res", Stage::Resource, &h.log))
        .filter(Recorder::new("exc", Stage::Exception, &h.log))
        .filter(Recorder::new("act", Stage::Action, &h.log))
        .filter(Recorder::new("result", Stage::Result, &h.log))
        .build();

    let response = h
        .invoke(ActionContext::new(fixtures::unit_action("secret")), catalog)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.executor.executed(), vec![ActionResult::status(StatusCode::FORBIDDEN)]);
    assert_eq!(h.events(), vec!["result.execute:status"]);
    assert_eq!(h.factory.created(), 0);
    assert_eq!(h.factory.released(), 0);
}

#[tokio::test]
async fn test_authorization_fault_goes_straight_to_caller() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(FnAuthorizationFilter::new("broken", |_ctx| {
            Err(InvalidOperation("token store down".into()).into())
        }))
        .filter(ErrorEnvelopeFilter::new())
        .build();

    let err = h
        .invoke(ActionContext::new(fixtures::unit_action("secret")), catalog)
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<InvalidOperation>(),
        Some(&InvalidOperation("token store down".into()))
    );
    assert_eq!(h.executor.count(), 0);
    assert_eq!(h.factory.created(), 0);
}

#[tokio::test]
async fn test_resource_short_circuit_marks_outer_filters_canceled() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(Recorder::new("outer", Stage::Resource, &h.log))
        .filter(DenyResource(StatusCode::IM_A_TEAPOT))
        .filter(Recorder::new("act", Stage::Action, &h.log))
        .filter(Recorder::new("result", Stage::Result, &h.log))
        .build();

    let response = h
        .invoke(ActionContext::new(fixtures::unit_action("brew")), catalog)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(
        h.events(),
        vec![
            "outer:executing",
            "result.execute:status",
            "outer:executed(canceled)",
        ]
    );
    assert_eq!(h.executor.count(), 1);
    assert_eq!(h.factory.created(), 0);
}

#[tokio::test]
async fn test_async_resource_short_circuit_without_result_executes_nothing() {
    struct Swallow;

    impl AsyncResourceFilter for Swallow {
        fn on_resource_execution<'a>(
            &'a self,
            _ctx: &'a mut ResourceExecutingContext<'_>,
            _next: ResourceExecutionDelegate<'a>,
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    impl Filter for Swallow {
        fn name(&self) -> &str {
            "swallow"
        }

        fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
            Some(self)
        }
    }

    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(AroundResource { log: h.log.clone() })
        .filter(Swallow)
        .build();

    let response = h
        .invoke(ActionContext::new(fixtures::unit_action("void")), catalog)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.events(), vec!["around:before", "around:after(canceled)"]);
    assert_eq!(h.executor.count(), 0);
    assert_eq!(h.factory.created(), 0);
}

#[tokio::test]
async fn test_action_short_circuit_flows_into_result_stage() {
    let h = Harness::new();
    let mut model_state = ModelState::new();
    model_state.add_error("quantity", "must be positive");
    let context =
        ActionContext::new(fixtures::value_action("order", 1)).with_model_state(model_state);
    let catalog = FilterCatalog::builder()
        .filter(ModelStateValidationFilter::new())
        .filter(Recorder::new("act", Stage::Action, &h.log))
        .filter(Recorder::new("result", Stage::Result, &h.log))
        .build();

    let response = h.invoke(context, catalog).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        h.events(),
        vec![
            "handler.create",
            "result:executing",
            "result.execute:object",
            "result:executed",
            "handler.release",
        ]
    );
    match h.executor.executed().as_slice() {
        [ActionResult::Object(object)] => {
            assert_eq!(object.value["error"]["code"], VALIDATION_ERROR_CODE);
            assert_eq!(
                object.value["error"]["details"]["quantity"][0],
                "must be positive"
            );
        }
        other => panic!("unexpected executions {other:?}"),
    }
}

#[tokio::test]
async fn test_result_cancel_executes_current_result_once() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(Recorder::new("outer", Stage::Result, &h.log))
        .filter(CancelResult)
        .filter(Recorder::new("inner", Stage::Result, &h.log))
        .build();

    h.invoke(ActionContext::new(fixtures::unit_action("quiet")), catalog)
        .await
        .unwrap();

    assert_eq!(
        h.events(),
        vec![
            "handler.create",
            "outer:executing",
            "result.execute:empty",
            "outer:executed(canceled)",
            "handler.release",
        ]
    );
    assert_eq!(h.executor.executed(), vec![ActionResult::Empty]);
}

#[tokio::test]
async fn test_cancel_after_continuing_marks_outer_filters_canceled() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(Recorder::new("outer", Stage::Result, &h.log))
        .filter(CancelAfterContinuing)
        .filter(Recorder::new("inner", Stage::Result, &h.log))
        .build();

    h.invoke(ActionContext::new(fixtures::unit_action("late")), catalog)
        .await
        .unwrap();

    assert_eq!(
        h.events(),
        vec![
            "handler.create",
            "outer:executing",
            "inner:executing",
            "result.execute:empty",
            "inner:executed",
            "outer:executed(canceled)",
            "handler.release",
        ]
    );
    assert_eq!(h.executor.count(), 1);
}

#[tokio::test]
async fn test_async_result_filter_skipping_continuation_executes_its_result() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(SkipResultExecution)
        .filter(Recorder::new("inner", Stage::Result, &h.log))
        .build();

    h.invoke(ActionContext::new(fixtures::unit_action("swap")), catalog)
        .await
        .unwrap();

    assert_eq!(h.executor.executed(), vec![ActionResult::content("replaced")]);
    assert!(!h.events().iter().any(|e| e.starts_with("inner:")));
    assert_eq!(h.factory.released(), 1);
}

// =============================================================================
// Faults
// =============================================================================

#[tokio::test]
async fn test_handled_handler_fault_runs_result_stage_with_empty_result() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(FnExceptionFilter::new("handle", |ctx| {
            assert!(ctx.exception().is_some());
            ctx.set_exception_handled(true);
            Ok(())
        }))
        .filter(Recorder::new("result", Stage::Result, &h.log))
        .build();

    let response = h
        .invoke(
            ActionContext::new(fixtures::failing_action("explode", "bad state")),
            catalog,
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.executor.executed(), vec![ActionResult::Empty]);
    assert_eq!(
        h.events(),
        vec![
            "handler.create",
            "result:executing",
            "result.execute:empty",
            "result:executed",
            "handler.release",
        ]
    );
}

#[tokio::test]
async fn test_handled_fault_skips_outer_exception_filters() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(Recorder::new("outer", Stage::Exception, &h.log))
        .filter(FnExceptionFilter::new("inner", {
            let log = h.log.clone();
            move |ctx: &mut ExceptionContext<'_>| {
                log.push("inner:exception");
                ctx.set_exception_handled(true);
                Ok(())
            }
        }))
        .filter(Recorder::new("result", Stage::Result, &h.log))
        .build();

    let response = h
        .invoke(
            ActionContext::new(fixtures::failing_action("explode", "bad state")),
            catalog,
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        h.events(),
        vec![
            "handler.create",
            "inner:exception",
            "result:executing",
            "result.execute:empty",
            "result:executed",
            "handler.release",
        ]
    );
    assert_eq!(h.executor.executed(), vec![ActionResult::Empty]);
}

#[tokio::test]
async fn test_taken_fault_skips_outer_exception_filters() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(Recorder::new("outer", Stage::Exception, &h.log))
        .filter(FnExceptionFilter::new("inner", {
            let log = h.log.clone();
            move |ctx: &mut ExceptionContext<'_>| {
                let taken = ctx.take_exception();
                log.push(format!("inner:took={}", taken.is_some()));
                Ok(())
            }
        }))
        .build();

    h.invoke(
        ActionContext::new(fixtures::failing_action("explode", "bad state")),
        catalog,
    )
    .await
    .unwrap();

    assert_eq!(
        h.events(),
        vec![
            "handler.create",
            "inner:took=true",
            "result.execute:empty",
            "handler.release",
        ]
    );
    assert_eq!(h.executor.count(), 1);
    assert_eq!(h.factory.released(), 1);
}

#[tokio::test]
async fn test_exception_filters_run_inner_first_before_resource_filters() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(Recorder::new("res", Stage::Resource, &h.log))
        .filter(Recorder::new("first", Stage::Exception, &h.log))
        .filter(Recorder::new("second", Stage::Exception, &h.log))
        .filter(Recorder::new("act", Stage::Action, &h.log))
        .filter(Recorder::new("result", Stage::Result, &h.log))
        .build();

    let err = h
        .invoke(
            ActionContext::new(fixtures::failing_action("explode", "bad state")),
            catalog,
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.downcast_ref::<InvalidOperation>(),
        Some(&InvalidOperation("bad state".into()))
    );
    assert_eq!(
        h.events(),
        vec![
            "res:executing",
            "handler.create",
            "act:executing",
            "act:executed(fault)",
            "second:exception",
            "first:exception",
            "res:executed(fault)",
            "handler.release",
        ]
    );
    assert_eq!(h.executor.count(), 0);
}

#[tokio::test]
async fn test_error_envelope_recovery_skips_result_filters() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(ErrorEnvelopeFilter::new())
        .filter(Recorder::new("result", Stage::Result, &h.log))
        .build();

    let response = h
        .invoke(
            ActionContext::new(fixtures::failing_action("explode", "bad state")),
            catalog,
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        h.events(),
        vec!["handler.create", "result.execute:object", "handler.release"]
    );
    match h.executor.executed().as_slice() {
        [ActionResult::Object(object)] => {
            assert_eq!(object.value["error"]["code"], UNHANDLED_ERROR_CODE);
            assert_eq!(object.value["error"]["message"], "An internal error occurred");
        }
        other => panic!("unexpected executions {other:?}"),
    }
}

#[tokio::test]
async fn test_error_envelope_exposes_details_in_development() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(ErrorEnvelopeFilter::from_options(&InvokerOptions::development()))
        .build();

    h.invoke(
        ActionContext::new(fixtures::failing_action("explode", "bad state")),
        catalog,
    )
    .await
    .unwrap();

    match h.executor.executed().as_slice() {
        [ActionResult::Object(object)] => {
            let message = object.value["error"]["message"].as_str().unwrap_or_default();
            assert!(message.contains("bad state"), "message was {message}");
        }
        other => panic!("unexpected executions {other:?}"),
    }
}

#[tokio::test]
async fn test_failing_exception_filter_replaces_fault() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(FnExceptionFilter::new("rethrow", |_ctx| {
            Err(anyhow::anyhow!("wrapped failure"))
        }))
        .build();

    let err = h
        .invoke(
            ActionContext::new(fixtures::failing_action("explode", "bad state")),
            catalog,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, InvokeError::Unhandled(_)));
    assert_eq!(err.to_string(), "wrapped failure");
    assert_eq!(h.factory.released(), 1);
}

#[tokio::test]
async fn test_result_write_fault_is_visible_to_resource_filters() {
    let h = Harness::with_executor(RecordingResultExecutor::failing("disk full"));
    let catalog = FilterCatalog::builder()
        .filter(AbsorbFaults { log: h.log.clone() })
        .build();

    h.invoke(ActionContext::new(fixtures::unit_action("write")), catalog)
        .await
        .unwrap();

    assert_eq!(
        h.events(),
        vec![
            "handler.create",
            "result.execute:empty",
            "absorb:invalid operation: disk full",
            "handler.release",
        ]
    );
    assert_eq!(h.executor.count(), 1);
}

#[tokio::test]
async fn test_unhandled_fault_reaches_caller_after_release() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(Recorder::new("res", Stage::Resource, &h.log))
        .build();

    let err = h
        .invoke(
            ActionContext::new(fixtures::failing_action("explode", "bad state")),
            catalog,
        )
        .await
        .unwrap_err();

    assert!(!err.is_misuse());
    assert!(err.downcast_ref::<InvalidOperation>().is_some());
    assert_eq!(h.factory.created(), 1);
    assert_eq!(h.factory.released(), 1);
}

// =============================================================================
// Misuse
// =============================================================================

#[tokio::test]
async fn test_resource_misuse_is_fatal() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(ResourceMisuse { swallow: false })
        .build();

    let err = h
        .invoke(ActionContext::new(fixtures::unit_action("misuse")), catalog)
        .await
        .unwrap_err();

    assert_misuse(&err, Stage::Resource, "resource_misuse");
    assert_eq!(h.executor.count(), 0);
    assert_eq!(h.factory.created(), 0);
}

#[tokio::test]
async fn test_resource_misuse_cannot_be_swallowed() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(ErrorEnvelopeFilter::new())
        .filter(ResourceMisuse { swallow: true })
        .build();

    let err = h
        .invoke(ActionContext::new(fixtures::unit_action("misuse")), catalog)
        .await
        .unwrap_err();

    assert_misuse(&err, Stage::Resource, "resource_misuse");
    assert_eq!(h.executor.count(), 0);
}

#[tokio::test]
async fn test_action_misuse_is_fatal_and_releases_handler() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(ErrorEnvelopeFilter::new())
        .filter(ActionMisuse)
        .build();

    let err = h
        .invoke(ActionContext::new(fixtures::unit_action("misuse")), catalog)
        .await
        .unwrap_err();

    assert_misuse(&err, Stage::Action, "action_misuse");
    assert_eq!(h.executor.count(), 0);
    assert_eq!(h.factory.created(), 1);
    assert_eq!(h.factory.released(), 1);
}

#[tokio::test]
async fn test_result_misuse_is_fatal() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder().filter(ResultMisuse).build();

    let err = h
        .invoke(ActionContext::new(fixtures::unit_action("misuse")), catalog)
        .await
        .unwrap_err();

    assert_misuse(&err, Stage::Result, "result_misuse");
    assert!(err.is_misuse());
    assert_eq!(h.executor.count(), 0);
    assert_eq!(h.factory.released(), 1);
}

// =============================================================================
// Middleware and built-in filters
// =============================================================================

#[tokio::test]
async fn test_middleware_short_circuit_executes_result_once() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(
            MiddlewareFilter::new()
                .with(Trace {
                    name: "trace",
                    log: h.log.clone(),
                })
                .with(Maintenance),
        )
        .filter(Recorder::new("act", Stage::Action, &h.log))
        .build();

    let response = h
        .invoke(ActionContext::new(fixtures::unit_action("down")), catalog)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        h.events(),
        vec!["trace:in", "trace:out", "result.execute:status"]
    );
    assert_eq!(h.factory.created(), 0);
}

#[tokio::test]
async fn test_middleware_chain_passes_through() {
    let h = Harness::new();
    let catalog = FilterCatalog::builder()
        .filter(
            MiddlewareFilter::new()
                .with(Trace {
                    name: "outer",
                    log: h.log.clone(),
                })
                .with(Trace {
                    name: "inner",
                    log: h.log.clone(),
                }),
        )
        .filter(TimingFilter::new())
        .build();

    h.invoke(ActionContext::new(fixtures::unit_action("up")), catalog)
        .await
        .unwrap();

    assert_eq!(
        h.events(),
        vec![
            "outer:in",
            "inner:in",
            "handler.create",
            "result.execute:empty",
            "inner:out",
            "outer:out",
            "handler.release",
        ]
    );
}

#[tokio::test]
async fn test_request_id_header_is_stamped() {
    let h = Harness::new();
    let request_id = RequestId::new();
    let context =
        ActionContext::new(fixtures::unit_action("ping")).with_request_id(request_id);
    let catalog = FilterCatalog::builder().filter(RequestIdFilter::new()).build();

    let response = h.invoke(context, catalog).await.unwrap();

    assert_eq!(
        response.headers()[REQUEST_ID_HEADER],
        request_id.to_string().as_str()
    );
}

#[tokio::test]
async fn test_require_header_denies_and_allows() {
    let catalog = || {
        FilterCatalog::builder()
            .filter(RequireHeaderFilter::new("authorization"))
            .build()
    };

    let denied = Harness::new();
    let response = denied
        .invoke(ActionContext::new(fixtures::unit_action("secret")), catalog())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(denied.factory.created(), 0);

    let allowed = Harness::new();
    let (parts, ()) = http::Request::builder()
        .uri("/secret")
        .header("authorization", "Bearer token")
        .body(())
        .unwrap()
        .into_parts();
    let response = allowed
        .invoke(
            ActionContext::from_parts(fixtures::unit_action("secret"), parts),
            catalog(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(allowed.factory.created(), 1);
    assert_eq!(allowed.factory.released(), 1);
}
