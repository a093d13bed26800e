//! Pipeline stage identifiers.

use serde::{Deserialize, Serialize};

/// The five filter stages of an action invocation, in execution order.
///
/// # Example
///
/// ```
/// use strata_core::Stage;
///
/// assert_eq!(Stage::all()[0], Stage::Authorization);
/// assert_eq!(Stage::Result.name(), "result");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Authorization filters. Runs first, never nests.
    Authorization,
    /// Resource filters. Wraps every stage below it.
    Resource,
    /// Exception filters. Wraps the action stage and reacts on the way out.
    Exception,
    /// Action filters. Wraps argument binding and the handler method.
    Action,
    /// Result filters. Wraps execution of the produced result.
    Result,
}

impl Stage {
    /// Returns the stage name as used in logs and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::Resource => "resource",
            Self::Exception => "exception",
            Self::Action => "action",
            Self::Result => "result",
        }
    }

    /// Returns all stages in execution order.
    #[must_use]
    pub const fn all() -> &'static [Stage] {
        &[
            Self::Authorization,
            Self::Resource,
            Self::Exception,
            Self::Action,
            Self::Result,
        ]
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
