//! Filter capability traits.
//!
//! A [`Filter`] is a bundle of optional capabilities. Each capability comes in
//! a synchronous flavour with separate before/after hooks and an asynchronous
//! flavour that wraps the rest of the pipeline through a continuation:
//!
//! | Stage | Sync | Async |
//! |-------|------|-------|
//! | Authorization | [`AuthorizationFilter`] | [`AsyncAuthorizationFilter`] |
//! | Resource | [`ResourceFilter`] | [`AsyncResourceFilter`] |
//! | Exception | [`ExceptionFilter`] | [`AsyncExceptionFilter`] |
//! | Action | [`ActionFilter`] | [`AsyncActionFilter`] |
//! | Result | [`ResultFilter`] | [`AsyncResultFilter`] |
//!
//! A filter advertises a capability by overriding the matching `as_*`
//! accessor. The catalog probes the accessors once when it is built.
//!
//! # Example
//!
//! ```
//! use strata_invoker::{Filter, ResourceFilter, ResourceExecutingContext, ResourceExecutedContext};
//!
//! struct Audit;
//!
//! impl ResourceFilter for Audit {
//!     fn on_resource_executing(&self, ctx: &mut ResourceExecutingContext<'_>) -> anyhow::Result<()> {
//!         tracing::info!(action = %ctx.descriptor().action_name(), "entering");
//!         Ok(())
//!     }
//!
//!     fn on_resource_executed(&self, ctx: &mut ResourceExecutedContext<'_>) -> anyhow::Result<()> {
//!         tracing::info!(canceled = ctx.canceled(), "leaving");
//!         Ok(())
//!     }
//! }
//!
//! impl Filter for Audit {
//!     fn name(&self) -> &str {
//!         "audit"
//!     }
//!
//!     fn as_resource(&self) -> Option<&dyn ResourceFilter> {
//!         Some(self)
//!     }
//! }
//! ```

use crate::context::{
    ActionExecutedContext, ActionExecutingContext, AuthorizationFilterContext, ExceptionContext,
    ResourceExecutedContext, ResourceExecutingContext, ResultExecutedContext,
    ResultExecutingContext,
};
use crate::delegate::{ActionExecutionDelegate, ResourceExecutionDelegate, ResultExecutionDelegate};
use strata_core::BoxFuture;

/// Runs first. Setting a result denies the request.
pub trait AuthorizationFilter: Send + Sync {
    /// Called once, in catalog order, before any other stage.
    fn on_authorization(&self, context: &mut AuthorizationFilterContext<'_>) -> anyhow::Result<()>;
}

/// Asynchronous [`AuthorizationFilter`].
pub trait AsyncAuthorizationFilter: Send + Sync {
    /// Called once, in catalog order, before any other stage.
    fn on_authorization<'a>(
        &'a self,
        context: &'a mut AuthorizationFilterContext<'_>,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Wraps everything after authorization.
pub trait ResourceFilter: Send + Sync {
    /// Before the rest of the pipeline. Setting a result short-circuits it.
    fn on_resource_executing(&self, context: &mut ResourceExecutingContext<'_>) -> anyhow::Result<()>;

    /// After the rest of the pipeline. Not called if this filter short-circuited.
    fn on_resource_executed(&self, context: &mut ResourceExecutedContext<'_>) -> anyhow::Result<()>;
}

/// Asynchronous [`ResourceFilter`].
///
/// Either call `next.run(context)` to continue, or set a result and return
/// without calling it. Doing both is a fatal misuse.
pub trait AsyncResourceFilter: Send + Sync {
    /// Wraps the rest of the pipeline.
    fn on_resource_execution<'a>(
        &'a self,
        context: &'a mut ResourceExecutingContext<'_>,
        next: ResourceExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Reacts to faults raised by action filters, binding or the handler.
pub trait ExceptionFilter: Send + Sync {
    /// Called only while a fault is in flight, innermost filter first.
    fn on_exception(&self, context: &mut ExceptionContext<'_>) -> anyhow::Result<()>;
}

/// Asynchronous [`ExceptionFilter`].
pub trait AsyncExceptionFilter: Send + Sync {
    /// Called only while a fault is in flight, innermost filter first.
    fn on_exception<'a>(
        &'a self,
        context: &'a mut ExceptionContext<'_>,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Wraps argument-bound invocation of the handler method.
pub trait ActionFilter: Send + Sync {
    /// Before the handler method. Setting a result short-circuits it.
    fn on_action_executing(&self, context: &mut ActionExecutingContext<'_>) -> anyhow::Result<()>;

    /// After the handler method. Not called if this filter short-circuited.
    fn on_action_executed(&self, context: &mut ActionExecutedContext<'_>) -> anyhow::Result<()>;
}

/// Asynchronous [`ActionFilter`].
pub trait AsyncActionFilter: Send + Sync {
    /// Wraps the handler method.
    fn on_action_execution<'a>(
        &'a self,
        context: &'a mut ActionExecutingContext<'_>,
        next: ActionExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Wraps execution of the produced result.
pub trait ResultFilter: Send + Sync {
    /// Before the result executes. May replace the result or set `cancel`.
    fn on_result_executing(&self, context: &mut ResultExecutingContext<'_>) -> anyhow::Result<()>;

    /// After the result executed. Not called if this filter canceled.
    fn on_result_executed(&self, context: &mut ResultExecutedContext<'_>) -> anyhow::Result<()>;
}

/// Asynchronous [`ResultFilter`].
///
/// Setting `cancel` and then calling `next.run(context)` is a fatal misuse.
pub trait AsyncResultFilter: Send + Sync {
    /// Wraps execution of the result.
    fn on_result_execution<'a>(
        &'a self,
        context: &'a mut ResultExecutingContext<'_>,
        next: ResultExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// A unit of cross-cutting logic attached to an action.
///
/// Filters are shared read-only across concurrent invocations, so any
/// per-request data belongs in the stage context, not in the filter.
pub trait Filter: Send + Sync {
    /// Name used in logs and misuse reports.
    fn name(&self) -> &str;

    /// Sort key within the catalog. Lower runs outer. Ties keep insertion order.
    fn order(&self) -> i32 {
        0
    }

    /// Synchronous authorization capability.
    fn as_authorization(&self) -> Option<&dyn AuthorizationFilter> {
        None
    }

    /// Asynchronous authorization capability.
    fn as_async_authorization(&self) -> Option<&dyn AsyncAuthorizationFilter> {
        None
    }

    /// Synchronous resource capability.
    fn as_resource(&self) -> Option<&dyn ResourceFilter> {
        None
    }

    /// Asynchronous resource capability.
    fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
        None
    }

    /// Synchronous exception capability.
    fn as_exception(&self) -> Option<&dyn ExceptionFilter> {
        None
    }

    /// Asynchronous exception capability.
    fn as_async_exception(&self) -> Option<&dyn AsyncExceptionFilter> {
        None
    }

    /// Synchronous action capability.
    fn as_action(&self) -> Option<&dyn ActionFilter> {
        None
    }

    /// Asynchronous action capability.
    fn as_async_action(&self) -> Option<&dyn AsyncActionFilter> {
        None
    }

    /// Synchronous result capability.
    fn as_result(&self) -> Option<&dyn ResultFilter> {
        None
    }

    /// Asynchronous result capability.
    fn as_async_result(&self) -> Option<&dyn AsyncResultFilter> {
        None
    }
}
