//! Error types for Strata.
//!
//! Filters, handlers and collaborators all fail with [`anyhow::Error`]. The
//! pipeline carries that error unchanged through the exception stage and, if
//! nothing handles it, hands it back inside [`InvokeError::Unhandled`] so the
//! caller can still downcast to the original type.
//!
//! Two conditions are raised by the pipeline itself:
//!
//! | Variant | Meaning |
//! |---|---|
//! | [`InvokeError::InvalidShortCircuit`] | A filter both short-circuited and continued. Fatal. |
//! | [`InvokeError::NullActionResult`] | An action declared to return a result returned none. |

use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`InvokeError`].
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Errors surfaced to the caller of an action invocation.
///
/// # Example
///
/// ```
/// use strata_core::InvokeError;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("order not found")]
/// struct OrderNotFound;
///
/// let err = InvokeError::from(anyhow::Error::new(OrderNotFound));
/// assert!(err.downcast_ref::<OrderNotFound>().is_some());
/// assert_eq!(err.to_string(), "order not found");
/// ```
#[derive(Error, Debug)]
pub enum InvokeError {
    /// A filter signalled "stop" and then still invoked its continuation.
    #[error("filter '{filter}' in the {stage} stage {signal} and then invoked its continuation")]
    InvalidShortCircuit {
        /// Stage whose continuation was misused.
        stage: Stage,
        /// Name of the offending filter.
        filter: String,
        /// What the filter had already signalled, e.g. "set a result".
        signal: &'static str,
    },

    /// An action whose declared return type is a result returned none.
    #[error("action '{action}' declared return type '{declared_type}' but produced no result")]
    NullActionResult {
        /// Display name of the action.
        action: String,
        /// The declared return type.
        declared_type: String,
    },

    /// A fault raised by a filter, the handler or a collaborator that no
    /// exception filter handled.
    #[error(transparent)]
    Unhandled(anyhow::Error),
}

impl InvokeError {
    /// Creates an invalid short-circuit error.
    #[must_use]
    pub fn invalid_short_circuit(
        stage: Stage,
        filter: impl Into<String>,
        signal: &'static str,
    ) -> Self {
        Self::InvalidShortCircuit {
            stage,
            filter: filter.into(),
            signal,
        }
    }

    /// Returns `true` for filter misuse.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self, Self::InvalidShortCircuit { .. })
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidShortCircuit { .. } => "INVALID_SHORT_CIRCUIT",
            Self::NullActionResult { .. } => "NULL_ACTION_RESULT",
            Self::Unhandled(_) => "UNHANDLED_EXCEPTION",
        }
    }

    /// Downcasts the original fault of an [`InvokeError::Unhandled`].
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Unhandled(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Consumes the error and returns it as an `anyhow::Error`.
    ///
    /// Unhandled faults are returned as-is, without another layer of wrapping.
    #[must_use]
    pub fn into_inner(self) -> anyhow::Error {
        match self {
            Self::Unhandled(err) => err,
            other => anyhow::Error::new(other),
        }
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>, expose_message: bool) -> ErrorEnvelope {
        let message = if expose_message || !matches!(self, Self::Unhandled(_)) {
            self.to_string()
        } else {
            "An internal error occurred".to_string()
        };
        ErrorEnvelope::new(self.code(), message, request_id)
    }
}

impl From<anyhow::Error> for InvokeError {
    /// Unwraps errors that are already an `InvokeError` so that a pipeline
    /// error returned through a filter's `?` keeps its variant.
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<InvokeError>() {
            Ok(invoke) => invoke,
            Err(other) => Self::Unhandled(other),
        }
    }
}

/// Serializable error envelope for responses.
///
/// ```json
/// { "error": { "code": "UNHANDLED_EXCEPTION", "message": "..." }, "request_id": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error details.
    pub error: ErrorDetail,
    /// Request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorEnvelope {
    /// Creates a new envelope.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>, request_id: Option<&str>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Serializes the envelope into a JSON value.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Error detail inside an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Additional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom: {0}")]
    struct Boom(u32);

    #[test]
    fn test_unhandled_preserves_identity() {
        let err = InvokeError::from(anyhow::Error::new(Boom(7)));
        assert_eq!(err.downcast_ref::<Boom>().map(|b| b.0), Some(7));
        assert_eq!(err.to_string(), "boom: 7");

        let inner = err.into_inner();
        assert!(inner.downcast_ref::<Boom>().is_some());
    }

    #[test]
    fn test_from_anyhow_unwraps_invoke_error() {
        let original = InvokeError::invalid_short_circuit(Stage::Resource, "cache", "set a result");
        let round = InvokeError::from(anyhow::Error::new(original));
        assert!(round.is_misuse());
    }

    #[test]
    fn test_invalid_short_circuit_message() {
        let err = InvokeError::invalid_short_circuit(Stage::Action, "audit", "set a result");
        assert_eq!(
            err.to_string(),
            "filter 'audit' in the action stage set a result and then invoked its continuation"
        );
        assert_eq!(err.code(), "INVALID_SHORT_CIRCUIT");
    }

    #[test]
    fn test_envelope_hides_unhandled_message() {
        let err = InvokeError::from(anyhow::anyhow!("db password leaked"));
        let envelope = err.to_envelope(Some("req-1"), false);
        assert_eq!(envelope.error.message, "An internal error occurred");
        assert_eq!(envelope.request_id.as_deref(), Some("req-1"));

        let exposed = err.to_envelope(None, true);
        assert_eq!(exposed.error.message, "db password leaked");
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = ErrorEnvelope::new("BAD", "bad things", None);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json, serde_json::json!({ "error": { "code": "BAD", "message": "bad things" } }));
    }
}
