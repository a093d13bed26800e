//! Test fixtures for Strata development and testing.
//!
//! This module provides ready-made action descriptors and recording
//! collaborators that can be used in tests across the Strata codebase.
//!
//! # Example
//!
//! ```
//! use strata_core::fixtures::{self, CountingHandlerFactory, RecordingResultExecutor};
//!
//! let descriptor = fixtures::value_action("getAnswer", 42);
//! let factory = CountingHandlerFactory::new();
//! let executor = RecordingResultExecutor::new();
//!
//! assert_eq!(descriptor.action_name(), "getAnswer");
//! assert_eq!(factory.created(), 0);
//! assert!(executor.executed().is_empty());
//! ```

use crate::context::ActionContext;
use crate::descriptor::ActionDescriptor;
use crate::executor::{HttpResultExecutor, ResultExecutor};
use crate::handler::{BoxFuture, FnActionMethod, HandlerFactory, HandlerInstance};
use crate::result::{ActionResult, ActionReturn, ReturnKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The error raised by [`failing_action`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid operation: {0}")]
pub struct InvalidOperation(pub String);

/// An action that returns nothing.
#[must_use]
pub fn unit_action(name: &str) -> ActionDescriptor {
    ActionDescriptor::builder(name)
        .method(FnActionMethod::new(ReturnKind::Unit, |_args| async {
            Ok(ActionReturn::Unit)
        }))
        .build()
}

/// An action declared as returning `i32` that returns `value`.
///
/// # Example
///
/// ```
/// use strata_core::{fixtures, ReturnKind};
///
/// let descriptor = fixtures::value_action("getAnswer", 42);
/// assert_eq!(descriptor.method().return_kind(), ReturnKind::value("i32"));
/// ```
#[must_use]
pub fn value_action(name: &str, value: i32) -> ActionDescriptor {
    ActionDescriptor::builder(name)
        .method(FnActionMethod::new(ReturnKind::value("i32"), move |_args| async move {
            Ok(ActionReturn::Value(value.into()))
        }))
        .build()
}

/// An action declared as returning an [`ActionResult`] that returns `result`.
#[must_use]
pub fn result_action(name: &str, result: ActionResult) -> ActionDescriptor {
    ActionDescriptor::builder(name)
        .method(FnActionMethod::new(ReturnKind::ActionResult, move |_args| {
            let result = result.clone();
            async move { Ok(ActionReturn::Result(result)) }
        }))
        .build()
}

/// An action that fails with [`InvalidOperation`].
#[must_use]
pub fn failing_action(name: &str, message: &str) -> ActionDescriptor {
    let message = message.to_string();
    ActionDescriptor::builder(name)
        .method(FnActionMethod::new(ReturnKind::Unit, move |_args| {
            let message = message.clone();
            async move { Err(InvalidOperation(message).into()) }
        }))
        .build()
}

/// A shared, ordered log of events for asserting pipeline order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    /// Returns a snapshot of all events.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Returns `true` if no events were logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// A handler factory that counts creates and releases.
#[derive(Debug, Clone, Default)]
pub struct CountingHandlerFactory {
    created: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    fail_with: Option<String>,
    log: Option<EventLog>,
}

impl CountingHandlerFactory {
    /// Creates a factory that produces `()` handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `create` call fail with [`InvalidOperation`].
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// Also records `handler.create` / `handler.release` in `log`.
    #[must_use]
    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Number of successful `create` calls.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of `release` calls.
    #[must_use]
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl HandlerFactory for CountingHandlerFactory {
    fn create(&self, _context: &ActionContext) -> anyhow::Result<HandlerInstance> {
        if let Some(message) = &self.fail_with {
            return Err(InvalidOperation(message.clone()).into());
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.push("handler.create");
        }
        Ok(Box::new(()))
    }

    fn release(&self, _context: &ActionContext, handler: HandlerInstance) {
        self.released.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.push("handler.release");
        }
        drop(handler);
    }
}

/// A result executor that records every result before writing it.
#[derive(Debug, Clone, Default)]
pub struct RecordingResultExecutor {
    executed: Arc<Mutex<Vec<ActionResult>>>,
    inner: HttpResultExecutor,
    fail_with: Option<String>,
    log: Option<EventLog>,
}

impl RecordingResultExecutor {
    /// Creates an executor that writes through [`HttpResultExecutor`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records results and then fails with [`InvalidOperation`].
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// Also records `result.execute:<kind>` in `log`.
    #[must_use]
    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Returns every executed result, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<ActionResult> {
        self.executed.lock().clone()
    }

    /// Returns the number of executions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.executed.lock().len()
    }
}

impl ResultExecutor for RecordingResultExecutor {
    fn execute<'a>(
        &'a self,
        context: &'a mut ActionContext,
        result: &'a ActionResult,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.executed.lock().push(result.clone());
            if let Some(log) = &self.log {
                log.push(format!("result.execute:{}", result.kind()));
            }
            if let Some(message) = &self.fail_with {
                return Err(InvalidOperation(message.clone()).into());
            }
            self.inner.execute(context, result).await
        })
    }
}
