//! Accumulated binding errors.
//!
//! Argument binders record per-parameter problems here instead of failing the
//! invocation. Whether an invalid [`ModelState`] stops the request is up to a
//! filter further down the pipeline.

use indexmap::IndexMap;
use serde::Serialize;

/// Default cap on the number of recorded errors.
pub const DEFAULT_MAX_ALLOWED_ERRORS: usize = 200;

/// Key under which the overflow marker is recorded.
pub const TOO_MANY_ERRORS_KEY: &str = "";

const TOO_MANY_ERRORS_MESSAGE: &str = "the maximum number of allowed model errors has been reached";

/// Per-key binding errors for one request.
///
/// # Example
///
/// ```
/// use strata_core::ModelState;
///
/// let mut state = ModelState::with_max_allowed_errors(2);
/// state.add_error("id", "must be a number");
/// state.add_error("name", "required");
/// state.add_error("email", "invalid");
///
/// assert!(!state.is_valid());
/// assert!(state.has_reached_max_errors());
/// assert!(state.errors("email").is_empty());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ModelState {
    errors: IndexMap<String, Vec<String>>,
    #[serde(skip)]
    error_count: usize,
    #[serde(skip)]
    max_allowed_errors: usize,
}

impl ModelState {
    /// Creates an empty model state with the default error cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_allowed_errors(DEFAULT_MAX_ALLOWED_ERRORS)
    }

    /// Creates an empty model state with a custom error cap.
    ///
    /// A cap of zero is treated as one so the overflow marker always fits.
    #[must_use]
    pub fn with_max_allowed_errors(max_allowed_errors: usize) -> Self {
        Self {
            errors: IndexMap::new(),
            error_count: 0,
            max_allowed_errors: max_allowed_errors.max(1),
        }
    }

    /// Records an error for `key`.
    ///
    /// Returns `false` if the cap was already reached and the error was dropped.
    /// The error that would exceed the cap is replaced by a single marker under
    /// [`TOO_MANY_ERRORS_KEY`].
    pub fn add_error(&mut self, key: impl Into<String>, message: impl Into<String>) -> bool {
        if self.has_reached_max_errors() {
            return false;
        }

        self.error_count += 1;
        if self.error_count == self.max_allowed_errors {
            self.errors
                .entry(TOO_MANY_ERRORS_KEY.to_string())
                .or_default()
                .push(TOO_MANY_ERRORS_MESSAGE.to_string());
            return false;
        }

        self.errors
            .entry(key.into())
            .or_default()
            .push(message.into());
        true
    }

    /// Returns `true` when no errors were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.error_count == 0
    }

    /// Returns `true` once the overflow marker has been recorded.
    #[must_use]
    pub fn has_reached_max_errors(&self) -> bool {
        self.error_count >= self.max_allowed_errors
    }

    /// Returns the configured error cap.
    #[must_use]
    pub fn max_allowed_errors(&self) -> usize {
        self.max_allowed_errors
    }

    /// Returns the total number of recorded errors, including the overflow marker.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Returns the errors recorded for `key`.
    #[must_use]
    pub fn errors(&self, key: &str) -> &[String] {
        self.errors.get(key).map_or(&[], Vec::as_slice)
    }

    /// Iterates over keys and their errors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Removes all errors.
    pub fn clear(&mut self) {
        self.errors.clear();
        self.error_count = 0;
    }

    /// Returns the errors as a JSON object of `key -> [messages]`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.errors).unwrap_or(serde_json::Value::Null)
    }
}

impl Default for ModelState {
    fn default() -> Self {
        Self::new()
    }
}
