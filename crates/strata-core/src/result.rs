//! Action results and return-value normalization.
//!
//! An action produces an [`ActionReturn`]; [`create_action_result`] turns it
//! into the [`ActionResult`] that the result stage executes, according to the
//! action's declared [`ReturnKind`]:
//!
//! | Declared | Returned | Result |
//! |---|---|---|
//! | any | `ActionReturn::Result(r)` | `r` |
//! | `Unit` or `Completion` | anything else | `ActionResult::Empty` |
//! | `ActionResult` | `Unit` or `null` | error: [`InvokeError::NullActionResult`] |
//! | `ActionResult` or `Value` | a value | `ActionResult::Object` |

use crate::context::ActionContext;
use crate::error::InvokeError;
use crate::handler::BoxFuture;
use http::StatusCode;
use serde_json::Value;
use std::sync::Arc;

/// A result whose execution logic lives outside the built-in executor.
pub trait CustomResult: Send + Sync + std::fmt::Debug {
    /// Writes this result to the response.
    fn execute<'a>(&'a self, context: &'a mut ActionContext) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// The outcome of an action, executed by a [`ResultExecutor`](crate::ResultExecutor).
#[derive(Debug, Clone)]
pub enum ActionResult {
    /// Writes nothing.
    Empty,
    /// Sets the status code only.
    Status(StatusCode),
    /// Writes text content.
    Content(ContentResult),
    /// Writes a JSON value.
    Object(ObjectResult),
    /// Delegates to the result itself.
    Custom(Arc<dyn CustomResult>),
}

impl ActionResult {
    /// Creates a status-only result.
    #[must_use]
    pub const fn status(status: StatusCode) -> Self {
        Self::Status(status)
    }

    /// Creates a `text/plain` content result.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self::Content(ContentResult::new(content))
    }

    /// Creates a JSON result with status `200`.
    #[must_use]
    pub fn object(value: impl Into<Value>) -> Self {
        Self::Object(ObjectResult::new(value))
    }

    /// Returns a short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Status(_) => "status",
            Self::Content(_) => "content",
            Self::Object(_) => "object",
            Self::Custom(_) => "custom",
        }
    }

    /// Returns the status code this result will set, if it sets one.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status) => Some(*status),
            Self::Content(content) => content.status,
            Self::Object(object) => Some(object.status.unwrap_or(StatusCode::OK)),
            Self::Empty | Self::Custom(_) => None,
        }
    }
}

impl PartialEq for ActionResult {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Status(a), Self::Status(b)) => a == b,
            (Self::Content(a), Self::Content(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Text content with an optional content type and status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentResult {
    /// Body text. `None` writes no body.
    pub content: Option<String>,
    /// Content type. Falls back to the response's, then to the executor default.
    pub content_type: Option<String>,
    /// Status code. `None` leaves the response status untouched.
    pub status: Option<StatusCode>,
}

impl ContentResult {
    /// Creates a content result with a body.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }
}

/// A JSON value produced by an action.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectResult {
    /// The value to serialize.
    pub value: Value,
    /// The declared type of the value, when known.
    pub declared_type: Option<String>,
    /// Status code. Defaults to `200`.
    pub status: Option<StatusCode>,
}

impl ObjectResult {
    /// Creates an object result.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            declared_type: None,
            status: None,
        }
    }

    /// Records the declared type.
    #[must_use]
    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }
}

/// What an action method returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionReturn {
    /// A ready-made result.
    Result(ActionResult),
    /// A plain value to wrap in an [`ObjectResult`].
    Value(Value),
    /// Nothing.
    Unit,
}

impl From<ActionResult> for ActionReturn {
    fn from(result: ActionResult) -> Self {
        Self::Result(result)
    }
}

/// The declared return shape of an action method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnKind {
    /// Returns nothing.
    Unit,
    /// Returns a bare completion marker with no value.
    Completion,
    /// Returns an [`ActionResult`].
    ActionResult,
    /// Returns a value of the named type.
    Value {
        /// Declared type name, recorded on the produced [`ObjectResult`].
        type_name: String,
    },
}

impl ReturnKind {
    /// Declares a value return of the named type.
    #[must_use]
    pub fn value(type_name: impl Into<String>) -> Self {
        Self::Value {
            type_name: type_name.into(),
        }
    }

    /// Returns the declared type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Unit => "()",
            Self::Completion => "impl Future<Output = ()>",
            Self::ActionResult => "ActionResult",
            Self::Value { type_name } => type_name,
        }
    }
}

/// Normalizes an action's return value into a result.
///
/// # Errors
///
/// Returns [`InvokeError::NullActionResult`] when an action declared to
/// return an [`ActionResult`] returned nothing or `null`.
///
/// # Example
///
/// ```
/// use strata_core::{create_action_result, ActionResult, ActionReturn, ReturnKind};
///
/// let result = create_action_result(&ReturnKind::value("i32"), ActionReturn::Value(42.into()), "getAnswer")
///     .unwrap();
/// match result {
///     ActionResult::Object(object) => {
///         assert_eq!(object.value, 42);
///         assert_eq!(object.declared_type.as_deref(), Some("i32"));
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub fn create_action_result(
    kind: &ReturnKind,
    returned: ActionReturn,
    action: &str,
) -> Result<ActionResult, InvokeError> {
    match (kind, returned) {
        (_, ActionReturn::Result(result)) => Ok(result),
        (ReturnKind::Unit | ReturnKind::Completion, _) => Ok(ActionResult::Empty),
        (ReturnKind::ActionResult, ActionReturn::Unit | ActionReturn::Value(Value::Null)) => {
            Err(InvokeError::NullActionResult {
                action: action.to_string(),
                declared_type: kind.type_name().to_string(),
            })
        }
        (ReturnKind::ActionResult, ActionReturn::Value(value)) => {
            Ok(ActionResult::Object(ObjectResult::new(value)))
        }
        (ReturnKind::Value { type_name }, ActionReturn::Value(value)) => Ok(ActionResult::Object(
            ObjectResult::new(value).with_declared_type(type_name.clone()),
        )),
        (ReturnKind::Value { type_name }, ActionReturn::Unit) => Ok(ActionResult::Object(
            ObjectResult::new(Value::Null).with_declared_type(type_name.clone()),
        )),
    }
}
