//! # Strata Core
//!
//! Shared vocabulary for the Strata action invocation pipeline.
//!
//! This crate provides the types that filters, handlers and the invoker
//! exchange, plus the collaborator interfaces the invoker consumes:
//!
//! - [`ActionContext`] - Per-request context: descriptor, request head, model state, response
//! - [`ActionDescriptor`] - Resolved metadata for a matched action
//! - [`ActionResult`] - What an action produces, executed by a [`ResultExecutor`]
//! - [`HandlerFactory`], [`ArgumentBinder`], [`ActionMethod`] - Handler lifecycle and invocation
//! - [`InvokeError`] - Errors surfaced to the caller of an invocation
//! - [`Stage`] - The five filter stages

#![doc(html_root_url = "https://docs.rs/strata-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod descriptor;
mod error;
mod executor;
pub mod fixtures;
mod handler;
mod model_state;
mod result;
mod stage;

pub use context::{ActionContext, RequestId, Response, ResponseBuffer};
pub use descriptor::{ActionDescriptor, ActionDescriptorBuilder, ParameterDescriptor};
pub use error::{ErrorDetail, ErrorEnvelope, InvokeError, InvokeResult};
pub use executor::{HttpResultExecutor, ResultExecutor, DEFAULT_CONTENT_TYPE, JSON_CONTENT_TYPE};
pub use handler::{
    prepare_arguments, ActionMethod, ArgumentBinder, Arguments, BoxFuture, FnActionMethod,
    FnArgumentBinder, FnHandlerFactory, HandlerFactory, HandlerInstance, NoArgumentBinder,
    TypeActivatorFactory, TypedActionMethod,
};
pub use model_state::{ModelState, DEFAULT_MAX_ALLOWED_ERRORS, TOO_MANY_ERRORS_KEY};
pub use result::{
    create_action_result, ActionResult, ActionReturn, ContentResult, CustomResult, ObjectResult,
    ReturnKind,
};
pub use stage::Stage;
