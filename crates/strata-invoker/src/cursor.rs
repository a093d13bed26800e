//! Stage-filtered walk over a [`FilterCatalog`].
//!
//! The cursor is reset once at the start of each stage and then asked for
//! "the next filter of this stage" until it runs dry. Every entry it looks
//! at is consumed, whether or not it matched.

use crate::catalog::{Capabilities, FilterCatalog, FilterEntry};
use crate::filter::{
    ActionFilter, AsyncActionFilter, AsyncAuthorizationFilter, AsyncExceptionFilter,
    AsyncResourceFilter, AsyncResultFilter, AuthorizationFilter, ExceptionFilter, Filter,
    ResourceFilter, ResultFilter,
};
use strata_core::Stage;

/// One stage's capability pair.
pub trait FilterStage {
    /// The synchronous capability.
    type Sync<'a>: ?Sized + 'a;
    /// The asynchronous capability.
    type Async<'a>: ?Sized + 'a;

    /// The stage this pair belongs to.
    const STAGE: Stage;
    /// Bit for the synchronous capability.
    const SYNC: Capabilities;
    /// Bit for the asynchronous capability.
    const ASYNC: Capabilities;

    /// Returns the synchronous capability of `filter`.
    fn sync<'a>(filter: &'a dyn Filter) -> Option<&'a Self::Sync<'a>>;

    /// Returns the asynchronous capability of `filter`.
    fn async_<'a>(filter: &'a dyn Filter) -> Option<&'a Self::Async<'a>>;
}

macro_rules! filter_stage {
    ($(#[$doc:meta])* $marker:ident, $stage:ident, $sync:ident, $async:ident, $sync_cap:ident, $async_cap:ident, $as_sync:ident, $as_async:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $marker;

        impl FilterStage for $marker {
            type Sync<'a> = dyn $sync + 'a;
            type Async<'a> = dyn $async + 'a;

            const STAGE: Stage = Stage::$stage;
            const SYNC: Capabilities = Capabilities::$sync_cap;
            const ASYNC: Capabilities = Capabilities::$async_cap;

            fn sync<'a>(filter: &'a dyn Filter) -> Option<&'a Self::Sync<'a>> {
                filter.$as_sync()
            }

            fn async_<'a>(filter: &'a dyn Filter) -> Option<&'a Self::Async<'a>> {
                filter.$as_async()
            }
        }
    };
}

filter_stage!(
    /// Authorization filters.
    AuthorizationStage, Authorization, AuthorizationFilter, AsyncAuthorizationFilter,
    AUTHORIZATION, ASYNC_AUTHORIZATION, as_authorization, as_async_authorization
);
filter_stage!(
    /// Resource filters.
    ResourceStage, Resource, ResourceFilter, AsyncResourceFilter,
    RESOURCE, ASYNC_RESOURCE, as_resource, as_async_resource
);
filter_stage!(
    /// Exception filters.
    ExceptionStage, Exception, ExceptionFilter, AsyncExceptionFilter,
    EXCEPTION, ASYNC_EXCEPTION, as_exception, as_async_exception
);
filter_stage!(
    /// Action filters.
    ActionStage, Action, ActionFilter, AsyncActionFilter,
    ACTION, ASYNC_ACTION, as_action, as_async_action
);
filter_stage!(
    /// Result filters.
    ResultStage, Result, ResultFilter, AsyncResultFilter,
    RESULT, ASYNC_RESULT, as_result, as_async_result
);

/// The capability the cursor selected for a filter.
///
/// A filter implementing both flavours of a stage is returned as `Sync`.
pub enum StageFilter<'a, S: ?Sized, A: ?Sized> {
    /// Before/after hooks.
    Sync(&'a S),
    /// Continuation-passing hook.
    Async(&'a A),
}

impl<S: ?Sized, A: ?Sized> StageFilter<'_, S, A> {
    /// Returns `true` for the asynchronous flavour.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

/// A filter selected by [`FilterCursor::next`].
pub struct Selected<'a, S: ?Sized, A: ?Sized> {
    /// The catalog entry.
    pub entry: &'a FilterEntry,
    /// The selected capability.
    pub filter: StageFilter<'a, S, A>,
}

/// Walks a catalog one stage at a time.
///
/// # Example
///
/// ```
/// use strata_invoker::{FilterCatalog, FilterCursor, ResourceStage, AuthorizationStage};
/// use strata_invoker::filters::{RequestIdFilter, RequireHeaderFilter};
///
/// let catalog = FilterCatalog::builder()
///     .filter(RequireHeaderFilter::new("x-api-key"))
///     .filter(RequestIdFilter::new())
///     .build();
///
/// let mut cursor = FilterCursor::new();
/// let first = cursor.next::<ResourceStage>(&catalog).unwrap();
/// assert_eq!(first.entry.name(), "request_id");
/// assert!(cursor.next::<ResourceStage>(&catalog).is_none());
///
/// cursor.reset();
/// assert!(cursor.next::<AuthorizationStage>(&catalog).is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterCursor {
    index: usize,
}

impl FilterCursor {
    /// Creates a cursor at the start of the catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self { index: 0 }
    }

    /// Rewinds to the start of the catalog.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Returns the number of entries consumed since the last reset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.index
    }

    /// Returns the next filter implementing either capability of stage `S`.
    ///
    /// Entries that do not match are skipped and stay consumed.
    #[allow(clippy::should_implement_trait)]
    pub fn next<'a, S: FilterStage>(
        &mut self,
        catalog: &'a FilterCatalog,
    ) -> Option<Selected<'a, S::Sync<'a>, S::Async<'a>>> {
        let wanted = S::SYNC | S::ASYNC;
        while let Some(entry) = catalog.entries().get(self.index) {
            self.index += 1;
            let capabilities = entry.capabilities();
            if !capabilities.intersects(wanted) {
                continue;
            }

            let filter = entry.filter();
            if capabilities.contains(S::SYNC) {
                if let Some(sync) = S::sync(filter) {
                    return Some(Selected {
                        entry,
                        filter: StageFilter::Sync(sync),
                    });
                }
            }
            if let Some(async_filter) = S::async_(filter) {
                return Some(Selected {
                    entry,
                    filter: StageFilter::Async(async_filter),
                });
            }
        }
        None
    }
}
