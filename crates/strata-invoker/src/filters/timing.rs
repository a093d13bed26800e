//! Resource-stage timing.

use crate::context::ResourceExecutingContext;
use crate::delegate::ResourceExecutionDelegate;
use crate::filter::{AsyncResourceFilter, Filter};
use std::time::Instant;
use strata_core::BoxFuture;

/// Measures everything nested inside it and records
/// `strata_stage_duration_seconds{stage="resource"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingFilter;

impl TimingFilter {
    /// Creates the filter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AsyncResourceFilter for TimingFilter {
    fn on_resource_execution<'a>(
        &'a self,
        context: &'a mut ResourceExecutingContext<'_>,
        next: ResourceExecutionDelegate<'a>,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let action = context.descriptor().display_name();
            let started = Instant::now();

            let executed = next.run(context).await?;
            let elapsed = started.elapsed();

            tracing::debug!(
                action = %action,
                canceled = executed.canceled(),
                faulted = executed.exception().is_some(),
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "resource stage timed"
            );
            strata_telemetry::metrics::record_stage_duration("resource", &action, elapsed);
            Ok(())
        })
    }
}

impl Filter for TimingFilter {
    fn name(&self) -> &str {
        "timing"
    }

    fn order(&self) -> i32 {
        i32::MIN
    }

    fn as_async_resource(&self) -> Option<&dyn AsyncResourceFilter> {
        Some(self)
    }
}
