//! Resolved action metadata.

use crate::handler::ActionMethod;
use serde_json::Value;
use std::sync::Arc;

/// A declared parameter of an action method.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    name: String,
    default: Option<Value>,
}

impl ParameterDescriptor {
    /// Creates a parameter without a default value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Sets the value used when binding produced nothing for this parameter.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Metadata for a matched action: names, parameters and the method to call.
///
/// Descriptors are built once per route and shared across requests.
///
/// # Example
///
/// ```
/// use strata_core::{ActionDescriptor, ActionReturn, FnActionMethod, ReturnKind};
///
/// let descriptor = ActionDescriptor::builder("getAnswer")
///     .controller("Answers")
///     .parameter("question")
///     .method(FnActionMethod::new(ReturnKind::value("i32"), |_args| async {
///         Ok(ActionReturn::Value(42.into()))
///     }))
///     .build();
///
/// assert_eq!(descriptor.display_name(), "Answers.getAnswer");
/// assert_eq!(descriptor.parameters().len(), 1);
/// ```
#[derive(Clone)]
pub struct ActionDescriptor {
    action_name: String,
    controller_name: Option<String>,
    parameters: Vec<ParameterDescriptor>,
    method: Arc<dyn ActionMethod>,
}

impl ActionDescriptor {
    /// Starts building a descriptor for the named action.
    #[must_use]
    pub fn builder(action_name: impl Into<String>) -> ActionDescriptorBuilder {
        ActionDescriptorBuilder {
            action_name: action_name.into(),
            controller_name: None,
            parameters: Vec::new(),
            method: None,
        }
    }

    /// Returns the action name.
    #[must_use]
    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    /// Returns the controller name, if the action belongs to one.
    #[must_use]
    pub fn controller_name(&self) -> Option<&str> {
        self.controller_name.as_deref()
    }

    /// Returns `Controller.action`, or just the action name.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.controller_name {
            Some(controller) => format!("{controller}.{}", self.action_name),
            None => self.action_name.clone(),
        }
    }

    /// Returns the declared parameters in positional order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Returns the method invoked for this action.
    #[must_use]
    pub fn method(&self) -> &Arc<dyn ActionMethod> {
        &self.method
    }
}

impl std::fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("action_name", &self.action_name)
            .field("controller_name", &self.controller_name)
            .field("parameters", &self.parameters)
            .field("return_kind", &self.method.return_kind())
            .finish()
    }
}

/// Builder for [`ActionDescriptor`].
pub struct ActionDescriptorBuilder {
    action_name: String,
    controller_name: Option<String>,
    parameters: Vec<ParameterDescriptor>,
    method: Option<Arc<dyn ActionMethod>>,
}

impl ActionDescriptorBuilder {
    /// Sets the controller name.
    #[must_use]
    pub fn controller(mut self, name: impl Into<String>) -> Self {
        self.controller_name = Some(name.into());
        self
    }

    /// Appends a parameter without a default.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParameterDescriptor::new(name));
        self
    }

    /// Appends a fully specified parameter.
    #[must_use]
    pub fn parameter_descriptor(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the method invoked for this action.
    #[must_use]
    pub fn method(mut self, method: impl ActionMethod + 'static) -> Self {
        self.method = Some(Arc::new(method));
        self
    }

    /// Sets an already shared method.
    #[must_use]
    pub fn shared_method(mut self, method: Arc<dyn ActionMethod>) -> Self {
        self.method = Some(method);
        self
    }

    /// Builds the descriptor.
    ///
    /// Without a method, the action does nothing and returns unit.
    #[must_use]
    pub fn build(self) -> ActionDescriptor {
        ActionDescriptor {
            action_name: self.action_name,
            controller_name: self.controller_name,
            parameters: self.parameters,
            method: self
                .method
                .unwrap_or_else(|| Arc::new(crate::handler::NoopActionMethod)),
        }
    }
}
