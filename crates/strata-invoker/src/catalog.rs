//! Ordered, immutable filter catalog.
//!
//! Capabilities are probed once per filter when the catalog is built, so the
//! cursor only performs a bit test per entry while walking a stage.

use crate::filter::Filter;
use bitflags::bitflags;
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// The set of stage capabilities a filter implements.
    #[derive(Copy, Debug, Default, Clone, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        /// Synchronous authorization.
        const AUTHORIZATION       = 1 << 0;
        /// Asynchronous authorization.
        const ASYNC_AUTHORIZATION = 1 << 1;
        /// Synchronous resource.
        const RESOURCE            = 1 << 2;
        /// Asynchronous resource.
        const ASYNC_RESOURCE      = 1 << 3;
        /// Synchronous exception.
        const EXCEPTION           = 1 << 4;
        /// Asynchronous exception.
        const ASYNC_EXCEPTION     = 1 << 5;
        /// Synchronous action.
        const ACTION              = 1 << 6;
        /// Asynchronous action.
        const ASYNC_ACTION        = 1 << 7;
        /// Synchronous result.
        const RESULT              = 1 << 8;
        /// Asynchronous result.
        const ASYNC_RESULT        = 1 << 9;
    }
}

impl Capabilities {
    /// Probes every capability accessor of `filter`.
    #[must_use]
    pub fn of(filter: &dyn Filter) -> Self {
        let probes = [
            (filter.as_authorization().is_some(), Self::AUTHORIZATION),
            (filter.as_async_authorization().is_some(), Self::ASYNC_AUTHORIZATION),
            (filter.as_resource().is_some(), Self::RESOURCE),
            (filter.as_async_resource().is_some(), Self::ASYNC_RESOURCE),
            (filter.as_exception().is_some(), Self::EXCEPTION),
            (filter.as_async_exception().is_some(), Self::ASYNC_EXCEPTION),
            (filter.as_action().is_some(), Self::ACTION),
            (filter.as_async_action().is_some(), Self::ASYNC_ACTION),
            (filter.as_result().is_some(), Self::RESULT),
            (filter.as_async_result().is_some(), Self::ASYNC_RESULT),
        ];
        probes
            .into_iter()
            .filter(|(present, _)| *present)
            .fold(Self::empty(), |acc, (_, cap)| acc | cap)
    }
}

/// A filter together with its probed capabilities.
#[derive(Clone)]
pub struct FilterEntry {
    filter: Arc<dyn Filter>,
    capabilities: Capabilities,
    order: i32,
}

impl FilterEntry {
    fn new(filter: Arc<dyn Filter>) -> Self {
        let capabilities = Capabilities::of(filter.as_ref());
        let order = filter.order();
        Self {
            filter,
            capabilities,
            order,
        }
    }

    /// Returns the filter.
    #[must_use]
    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    /// Returns the filter name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.filter.name()
    }

    /// Returns the capabilities probed at build time.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns the sort key captured at build time.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }
}

impl fmt::Debug for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEntry")
            .field("name", &self.name())
            .field("order", &self.order)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// The ordered filters of one action.
///
/// A catalog is never mutated once built. It is usually cached per action and
/// shared across concurrent invocations behind an [`Arc`].
///
/// # Example
///
/// ```
/// use strata_invoker::FilterCatalog;
/// use strata_invoker::filters::{RequestIdFilter, RequireHeaderFilter};
///
/// let catalog = FilterCatalog::builder()
///     .filter(RequestIdFilter::new())
///     .filter(RequireHeaderFilter::new("x-api-key"))
///     .build();
///
/// assert_eq!(catalog.len(), 2);
/// assert_eq!(catalog.names(), vec!["request_id", "require_header"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterCatalog {
    entries: Vec<FilterEntry>,
}

impl FilterCatalog {
    /// Creates a catalog builder.
    #[must_use]
    pub fn builder() -> FilterCatalogBuilder {
        FilterCatalogBuilder::default()
    }

    /// Creates an empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the entries in execution order.
    #[must_use]
    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    /// Returns the number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the catalog has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the filter names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(FilterEntry::name).collect()
    }

    /// Returns a builder seeded with this catalog's filters.
    ///
    /// Used to derive a per-request catalog without touching the shared one.
    #[must_use]
    pub fn to_builder(&self) -> FilterCatalogBuilder {
        FilterCatalogBuilder {
            filters: self.entries.iter().map(|e| Arc::clone(&e.filter)).collect(),
        }
    }
}

/// Builder for [`FilterCatalog`].
#[derive(Default)]
pub struct FilterCatalogBuilder {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterCatalogBuilder {
    /// Appends a filter.
    ///
    /// Insertion order only breaks ties: [`build`](Self::build) sorts by
    /// [`Filter::order`] first, so a filter with a lower order runs before
    /// filters added ahead of it. Built-in filters such as
    /// [`TimingFilter`](crate::filters::TimingFilter) use negative orders.
    #[must_use]
    pub fn filter<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Appends an already shared filter. Ordering follows [`filter`](Self::filter).
    #[must_use]
    pub fn shared(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Probes capabilities and stable-sorts by [`Filter::order`].
    #[must_use]
    pub fn build(self) -> FilterCatalog {
        let mut entries: Vec<FilterEntry> = self.filters.into_iter().map(FilterEntry::new).collect();
        entries.sort_by_key(FilterEntry::order);
        FilterCatalog { entries }
    }
}
