//! # Strata Invoker
//!
//! The filter pipeline that runs a matched action.
//!
//! An [`ActionInvoker`] takes an [`ActionContext`](strata_core::ActionContext)
//! and an ordered [`FilterCatalog`], then runs five stages:
//!
//! 1. **Authorization** - may deny the request outright
//! 2. **Resource** - wraps everything below, may short-circuit
//! 3. **Exception** - reacts to faults from the action stage
//! 4. **Action** - wraps argument binding output and the handler method
//! 5. **Result** - wraps execution of the produced result
//!
//! Filters are values implementing [`Filter`] plus any of the capability
//! traits in [`filter`]. Built-in filters live in [`filters`], and
//! [`MiddlewareFilter`] runs a [`Middleware`] chain inside the resource stage.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use strata_core::{fixtures, ActionContext, HttpResultExecutor, NoArgumentBinder, TypeActivatorFactory};
//! use strata_invoker::filters::{RequestIdFilter, REQUEST_ID_HEADER};
//! use strata_invoker::{ActionInvoker, FilterCatalog};
//!
//! # tokio_test::block_on(async {
//! let invoker = ActionInvoker::new(
//!     TypeActivatorFactory::<()>::new(),
//!     NoArgumentBinder,
//!     HttpResultExecutor::new(),
//! );
//! let filters = Arc::new(FilterCatalog::builder().filter(RequestIdFilter::new()).build());
//!
//! let context = ActionContext::new(fixtures::value_action("getAnswer", 42));
//! let response = invoker.invoke(context, filters).await.unwrap();
//! assert!(response.headers().contains_key(REQUEST_ID_HEADER));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/strata-invoker/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod catalog;
mod context;
mod cursor;
mod delegate;
pub mod filter;
pub mod filters;
mod invoker;
mod middleware;
mod options;
mod state;

pub use catalog::{Capabilities, FilterCatalog, FilterCatalogBuilder, FilterEntry};
pub use context::{
    ActionExecutedContext, ActionExecutingContext, AuthorizationFilterContext, ExceptionContext,
    ResourceExecutedContext, ResourceExecutingContext, ResultExecutedContext,
    ResultExecutingContext,
};
pub use cursor::{
    ActionStage, AuthorizationStage, ExceptionStage, FilterCursor, FilterStage, ResourceStage,
    ResultStage, Selected, StageFilter,
};
pub use delegate::{ActionExecutionDelegate, ResourceExecutionDelegate, ResultExecutionDelegate};
pub use filter::{
    ActionFilter, AsyncActionFilter, AsyncAuthorizationFilter, AsyncExceptionFilter,
    AsyncResourceFilter, AsyncResultFilter, AuthorizationFilter, ExceptionFilter, Filter,
    ResourceFilter, ResultFilter,
};
pub use invoker::ActionInvoker;
pub use middleware::{Middleware, MiddlewareFilter, MiddlewareNext, MIDDLEWARE_FILTER_ORDER};
pub use options::InvokerOptions;
