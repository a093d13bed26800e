//! Closure adapters.

use crate::context::{AuthorizationFilterContext, ExceptionContext};
use crate::filter::{AuthorizationFilter, ExceptionFilter, Filter};

/// An authorization filter backed by a closure.
///
/// # Example
///
/// ```
/// use strata_core::ActionResult;
/// use strata_invoker::filters::FnAuthorizationFilter;
/// use strata_invoker::FilterCatalog;
///
/// let deny_all = FnAuthorizationFilter::new("deny_all", |ctx| {
///     ctx.set_result(ActionResult::status(http::StatusCode::FORBIDDEN));
///     Ok(())
/// });
/// let catalog = FilterCatalog::builder().filter(deny_all).build();
/// assert_eq!(catalog.names(), vec!["deny_all"]);
/// ```
pub struct FnAuthorizationFilter<F> {
    name: String,
    order: i32,
    func: F,
}

impl<F> FnAuthorizationFilter<F> {
    /// Wraps `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut AuthorizationFilterContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            order: 0,
            func,
        }
    }

    /// Sets the sort key.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl<F> AuthorizationFilter for FnAuthorizationFilter<F>
where
    F: Fn(&mut AuthorizationFilterContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn on_authorization(&self, context: &mut AuthorizationFilterContext<'_>) -> anyhow::Result<()> {
        (self.func)(context)
    }
}

impl<F> Filter for FnAuthorizationFilter<F>
where
    F: Fn(&mut AuthorizationFilterContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn as_authorization(&self) -> Option<&dyn AuthorizationFilter> {
        Some(self)
    }
}

/// An exception filter backed by a closure.
///
/// The closure only runs while a fault is in flight.
pub struct FnExceptionFilter<F> {
    name: String,
    order: i32,
    func: F,
}

impl<F> FnExceptionFilter<F> {
    /// Wraps `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut ExceptionContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            order: 0,
            func,
        }
    }

    /// Sets the sort key.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl<F> ExceptionFilter for FnExceptionFilter<F>
where
    F: Fn(&mut ExceptionContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn on_exception(&self, context: &mut ExceptionContext<'_>) -> anyhow::Result<()> {
        (self.func)(context)
    }
}

impl<F> Filter for FnExceptionFilter<F>
where
    F: Fn(&mut ExceptionContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn as_exception(&self) -> Option<&dyn ExceptionFilter> {
        Some(self)
    }
}
