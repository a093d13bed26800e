//! Stage contexts.
//!
//! Each context is a narrow view over the invocation's single state record.
//! Writing through one context is immediately visible to the pipeline and to
//! every context created afterwards, so there is no copying between stages.
//!
//! | Context | Exposes |
//! |---|---|
//! | [`AuthorizationFilterContext`] | result |
//! | [`ResourceExecutingContext`] | result |
//! | [`ResourceExecutedContext`] | canceled, exception, result |
//! | [`ExceptionContext`] | exception, recovery result |
//! | [`ActionExecutingContext`] | arguments, handler, result |
//! | [`ActionExecutedContext`] | canceled, exception, handler, result |
//! | [`ResultExecutingContext`] | result, cancel |
//! | [`ResultExecutedContext`] | canceled, exception, result |

use crate::catalog::FilterCatalog;
use crate::state::{Executed, InvocationState};
use std::any::Any;
use strata_core::{ActionContext, ActionDescriptor, ActionResult, Arguments, RequestId};

static EMPTY_RESULT: ActionResult = ActionResult::Empty;

macro_rules! stage_context {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<'s> {
            pub(crate) state: &'s mut InvocationState,
        }

        impl<'s> $name<'s> {
            pub(crate) fn new(state: &'s mut InvocationState) -> Self {
                Self { state }
            }

            /// Returns the request context.
            #[must_use]
            pub fn action_context(&self) -> &ActionContext {
                &self.state.context
            }

            /// Returns the request context mutably.
            pub fn action_context_mut(&mut self) -> &mut ActionContext {
                &mut self.state.context
            }

            /// Returns the descriptor of the action being invoked.
            #[must_use]
            pub fn descriptor(&self) -> &ActionDescriptor {
                self.state.context.descriptor()
            }

            /// Returns the filters of this invocation.
            #[must_use]
            pub fn filters(&self) -> &FilterCatalog {
                &self.state.filters
            }

            /// Returns the request ID.
            #[must_use]
            pub fn request_id(&self) -> RequestId {
                self.state.context.request_id()
            }
        }

        impl std::fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("action", &self.state.context.descriptor().action_name())
                    .field("result", &self.state.result)
                    .field("exception", &self.state.exception.as_ref().map(ToString::to_string))
                    .finish_non_exhaustive()
            }
        }
    };
}

macro_rules! fault_accessors {
    ($name:ident) => {
        impl $name<'_> {
            /// Returns the fault in flight, if any.
            #[must_use]
            pub fn exception(&self) -> Option<&anyhow::Error> {
                self.state.exception.as_ref()
            }

            /// Returns `true` once a filter marked the fault handled.
            #[must_use]
            pub fn exception_handled(&self) -> bool {
                self.state.exception_handled
            }

            /// Marks the fault handled. It is dropped when the stage completes.
            pub fn set_exception_handled(&mut self, handled: bool) {
                self.state.exception_handled = handled;
            }

            /// Removes and returns the fault in flight.
            pub fn take_exception(&mut self) -> Option<anyhow::Error> {
                self.state.exception_handled = false;
                self.state.exception.take()
            }
        }
    };
}

stage_context!(
    /// Passed to authorization filters.
    AuthorizationFilterContext
);

impl AuthorizationFilterContext<'_> {
    /// Returns the result set by an earlier authorization filter.
    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        self.state.result.as_ref()
    }

    /// Denies the request with `result`. Remaining stages are skipped.
    pub fn set_result(&mut self, result: ActionResult) {
        self.state.result = Some(result);
    }
}

stage_context!(
    /// Passed to resource filters before the rest of the pipeline runs.
    ResourceExecutingContext
);

impl ResourceExecutingContext<'_> {
    /// Returns the short-circuit result, if set.
    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        self.state.result.as_ref()
    }

    /// Short-circuits the rest of the pipeline with `result`.
    pub fn set_result(&mut self, result: ActionResult) {
        self.state.result = Some(result);
    }
}

stage_context!(
    /// Passed to resource filters after the rest of the pipeline ran.
    ResourceExecutedContext
);
fault_accessors!(ResourceExecutedContext);

impl ResourceExecutedContext<'_> {
    /// Returns `true` if a resource filter short-circuited.
    #[must_use]
    pub fn canceled(&self) -> bool {
        self.state.resource_executed == Some(Executed::Canceled)
    }

    /// Returns the result that was executed, if any.
    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        self.state.result.as_ref()
    }
}

stage_context!(
    /// Passed to exception filters while a fault is in flight.
    ExceptionContext
);
fault_accessors!(ExceptionContext);

impl ExceptionContext<'_> {
    /// Returns the recovery result, if set.
    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        self.state.exception_result.as_ref()
    }

    /// Recovers from the fault with `result`.
    ///
    /// The fault is dropped, outer exception filters are skipped, and the
    /// result executes directly without running result filters.
    pub fn set_result(&mut self, result: ActionResult) {
        self.state.exception_result = Some(result);
    }
}

stage_context!(
    /// Passed to action filters before the handler method runs.
    ActionExecutingContext
);

impl ActionExecutingContext<'_> {
    /// Returns the bound arguments.
    #[must_use]
    pub fn arguments(&self) -> &Arguments {
        &self.state.arguments
    }

    /// Returns the bound arguments mutably.
    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.state.arguments
    }

    /// Returns the handler instance.
    #[must_use]
    pub fn handler(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.state.handler.as_deref()
    }

    /// Returns the handler instance mutably.
    pub fn handler_mut(&mut self) -> Option<&mut (dyn Any + Send + Sync)> {
        self.state.handler.as_deref_mut()
    }

    /// Returns the short-circuit result, if set.
    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        self.state.result.as_ref()
    }

    /// Short-circuits the handler method with `result`.
    pub fn set_result(&mut self, result: ActionResult) {
        self.state.result = Some(result);
    }
}

stage_context!(
    /// Passed to action filters after the handler method ran.
    ActionExecutedContext
);
fault_accessors!(ActionExecutedContext);

impl ActionExecutedContext<'_> {
    /// Returns `true` if an action filter short-circuited.
    #[must_use]
    pub fn canceled(&self) -> bool {
        self.state.action_executed == Some(Executed::Canceled)
    }

    /// Returns the handler instance.
    #[must_use]
    pub fn handler(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.state.handler.as_deref()
    }

    /// Returns the produced result, if any.
    #[must_use]
    pub fn result(&self) -> Option<&ActionResult> {
        self.state.result.as_ref()
    }

    /// Replaces the produced result.
    pub fn set_result(&mut self, result: ActionResult) {
        self.state.result = Some(result);
    }
}

stage_context!(
    /// Passed to result filters before the result executes.
    ResultExecutingContext
);

impl ResultExecutingContext<'_> {
    /// Returns the result about to execute.
    #[must_use]
    pub fn result(&self) -> &ActionResult {
        self.state.result.as_ref().unwrap_or(&EMPTY_RESULT)
    }

    /// Replaces the result about to execute.
    pub fn set_result(&mut self, result: ActionResult) {
        self.state.result = Some(result);
    }

    /// Returns `true` if a filter asked to stop the result filter chain.
    #[must_use]
    pub fn cancel(&self) -> bool {
        self.state.cancel
    }

    /// Stops the remaining result filters. The current result still executes once.
    pub fn set_cancel(&mut self, cancel: bool) {
        self.state.cancel = cancel;
    }
}

stage_context!(
    /// Passed to result filters after the result executed.
    ResultExecutedContext
);
fault_accessors!(ResultExecutedContext);

impl ResultExecutedContext<'_> {
    /// Returns `true` if a result filter canceled the chain.
    #[must_use]
    pub fn canceled(&self) -> bool {
        self.state.result_executed == Some(Executed::Canceled)
    }

    /// Returns the result that executed.
    #[must_use]
    pub fn result(&self) -> &ActionResult {
        self.state.result.as_ref().unwrap_or(&EMPTY_RESULT)
    }
}
