//! Per-invocation state.
//!
//! Every stage context is a view over one [`InvocationState`]. Nothing here
//! is shared between invocations.

use crate::catalog::FilterCatalog;
use crate::cursor::FilterCursor;
use std::sync::Arc;
use strata_core::{ActionContext, ActionResult, Arguments, HandlerInstance, InvokeError, Stage};

/// How a nestable stage's inner pipeline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Executed {
    /// The inner pipeline ran.
    Completed,
    /// A filter short-circuited.
    Canceled,
}

/// A filter both short-circuited and invoked its continuation.
#[derive(Debug, Clone)]
pub(crate) struct Misuse {
    stage: Stage,
    filter: String,
    signal: &'static str,
}

impl Misuse {
    pub(crate) fn new(stage: Stage, filter: &str, signal: &'static str) -> Self {
        Self {
            stage,
            filter: filter.to_string(),
            signal,
        }
    }

    pub(crate) fn to_error(&self) -> InvokeError {
        InvokeError::invalid_short_circuit(self.stage, self.filter.clone(), self.signal)
    }
}

pub(crate) struct InvocationState {
    pub(crate) context: ActionContext,
    pub(crate) filters: Arc<FilterCatalog>,
    pub(crate) cursor: FilterCursor,
    pub(crate) handler: Option<HandlerInstance>,
    pub(crate) arguments: Arguments,
    pub(crate) result: Option<ActionResult>,
    pub(crate) cancel: bool,
    pub(crate) exception: Option<anyhow::Error>,
    pub(crate) exception_handled: bool,
    pub(crate) exception_result: Option<ActionResult>,
    pub(crate) resource_executed: Option<Executed>,
    pub(crate) action_executed: Option<Executed>,
    pub(crate) result_executed: Option<Executed>,
    pub(crate) fatal: Option<Misuse>,
}

impl InvocationState {
    pub(crate) fn new(context: ActionContext, filters: Arc<FilterCatalog>) -> Self {
        Self {
            context,
            filters,
            cursor: FilterCursor::new(),
            handler: None,
            arguments: Arguments::new(),
            result: None,
            cancel: false,
            exception: None,
            exception_handled: false,
            exception_result: None,
            resource_executed: None,
            action_executed: None,
            result_executed: None,
            fatal: None,
        }
    }

    /// Records a fault, replacing any fault already in flight.
    pub(crate) fn capture(&mut self, stage: Stage, error: anyhow::Error) {
        tracing::debug!(stage = %stage, error = %error, "captured fault");
        self.exception = Some(error);
        self.exception_handled = false;
    }

    /// Drops the in-flight fault if a filter marked it handled.
    ///
    /// Returns `true` if a fault was dropped.
    pub(crate) fn settle_exception(&mut self) -> bool {
        if !self.exception_handled {
            return false;
        }
        self.exception_handled = false;
        self.exception.take().is_some()
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.fatal.is_some()
    }
}

/// Marks a stage's inner pipeline as ended unless a deeper level already did.
pub(crate) fn complete(slot: &mut Option<Executed>, how: Executed) {
    slot.get_or_insert(how);
}
