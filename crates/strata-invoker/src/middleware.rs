//! Middleware chains running inside the resource stage.
//!
//! A [`MiddlewareFilter`] wraps an ordered chain of [`Middleware`] around
//! everything after authorization. Each middleware receives a
//! [`MiddlewareNext`] and decides whether to continue:
//!
//! ```text
//! MiddlewareFilter ─► m1 ─► m2 ─► ... ─► rest of the pipeline
//! ```
//!
//! A middleware that returns without calling `next.run()` short-circuits the
//! pipeline. If it set a result on the context, that result is executed.
//!
//! # Example
//!
//! ```
//! use strata_core::{ActionResult, BoxFuture};
//! use strata_invoker::{Middleware, MiddlewareFilter, MiddlewareNext, ResourceExecutingContext};
//!
//! struct Maintenance;
//!
//! impl Middleware for Maintenance {
//!     fn name(&self) -> &'static str {
//!         "maintenance"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut ResourceExecutingContext<'_>,
//!         _next: MiddlewareNext<'a>,
//!     ) -> BoxFuture<'a, anyhow::Result<()>> {
//!         Box::pin(async move {
//!             ctx.set_result(ActionResult::status(http::StatusCode::SERVICE_UNAVAILABLE));
//!             Ok(())
//!         })
//!     }
//! }
//!
//! let filter = MiddlewareFilter::new().with(Maintenance);
//! assert_eq!(filter.middleware_names(), vec!["maintenance"]);
//! ```

use crate::context::ResourceExecutingContext;
use crate::delegate::ResourceExecutionDelegate;
use crate::filter::{AsyncResourceFilter, Filter};
use std::sync::Arc;
use strata_core::BoxFuture;

/// Sort key of [`MiddlewareFilter`]: outside every default-ordered filter.
pub const MIDDLEWARE_FILTER_ORDER: i32 = i32::MIN + 100;

/// A step in a [`MiddlewareFilter`] chain.
///
/// # Invariants
///
/// - Call `next.run()` at most once. Not calling it short-circuits.
/// - Do not set a result and then call `next.run()`: that is a misuse and
///   ends the invocation with an error.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, optionally continuing through `next`.
    fn process<'a>(
        &'a self,
        ctx: &'a mut ResourceExecutingContext<'_>,
        next: MiddlewareNext<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// The rest of a middleware chain.
///
/// The last link is the resource continuation of the owning
/// [`MiddlewareFilter`].
pub struct MiddlewareNext<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    terminal: ResourceExecutionDelegate<'a>,
}

impl MiddlewareNext<'_> {
    /// Invokes the next middleware, or the rest of the pipeline.
    ///
    /// This consumes `self` to ensure it can only be called once.
    ///
    /// # Errors
    ///
    /// Propagates errors from later middleware and misuse reported by the
    /// pipeline.
    pub async fn run(self, ctx: &mut ResourceExecutingContext<'_>) -> anyhow::Result<()> {
        match self.remaining.split_first() {
            Some((middleware, remaining)) => {
                tracing::debug!(middleware = middleware.name(), "middleware");
                let next = MiddlewareNext {
                    remaining,
                    terminal: self.terminal,
                };
                middleware.process(ctx, next).await
            }
            None => self.terminal.run(ctx).await.map(drop),
        }
    }
}

/// Async resource filter that runs a middleware chain.
#[derive(Default)]
pub struct MiddlewareFilter {
    chain: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareFilter {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `middleware` to the chain.
    #[must_use]
    pub fn with(self, middleware: impl Middleware) -> Self {
        self.shared(Arc::new(middleware))
    }

    /// Appends shared `middleware` to the chain.
    #[must_use]
    pub fn shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.chain.push(middleware);
        self
    }

    /// Returns the chain's names, outermost first.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|m| m.name()).collect()
    }
}

impl std::fmt::Debug for MiddlewareFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareFilter")
            .field("chain", &self.middleware_names())
            .finish()
    }
}

impl AsyncResourceFilter for MiddlewareFilter {
    fn on_resource_execution<'a>(
        &'a self,
        context: &'a mut ResourceExecutingContext<'_>,
        next: ResourceExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let chain = MiddlewareNext {
                remaining: &self.chain,
                terminal: next,
            };
            chain.run(context).await
        })
    }
}

impl Filter for MiddlewareFilter {
    fn name(&self) -> &str {
        "middleware"
    }

    fn order(&self) -> i32 {
        MIDDLEWARE_FILTER_ORDER
    }

    fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Capabilities, FilterCatalog};
    use crate::catalog::test_support::CapFilter;

    struct Named(&'static str);

    impl Middleware for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut ResourceExecutingContext<'_>,
            next: MiddlewareNext<'a>,
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(next.run(ctx))
        }
    }

    #[test]
    fn test_chain_keeps_insertion_order() {
        let filter = MiddlewareFilter::new().with(Named("a")).with(Named("b"));
        assert_eq!(filter.middleware_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_sorts_outside_default_filters() {
        let catalog = FilterCatalog::builder()
            .filter(CapFilter::new("plain", Capabilities::RESOURCE))
            .filter(MiddlewareFilter::new())
            .build();
        assert_eq!(catalog.names(), vec!["middleware", "plain"]);
        assert!(catalog.entries()[0]
            .capabilities()
            .contains(Capabilities::ASYNC_RESOURCE));
    }
}
