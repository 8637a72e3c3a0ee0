//! Page fetching.
//!
//! The application supplies a [`DataSource`] that produces one page of items
//! plus the total count and reports back through a [`PageCallback`]. The
//! [`FetchCoordinator`] decides when to ask, deduplicates requests per page and
//! discards results that belong to an outdated [`Generation`].

mod callback;
mod coordinator;
mod spawned;
mod static_source;

pub use callback::PageCallback;
pub use coordinator::FetchCoordinator;
pub use spawned::*;
pub use static_source::*;

use serde::Serialize;

/// Version of the cache's filter/configuration state.
///
/// Every effective clear starts a new generation. Results tagged with an older
/// generation are dropped on arrival.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    /// Returns the raw counter value.
    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Parameters of a single page fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FetchRequest {
    /// Zero-based page to fetch.
    pub page_index: usize,
    /// Maximum number of items the page may contain.
    pub page_size: usize,
    /// Caller-supplied filter criterion, opaque to the cache.
    pub filter: String,
}

impl FetchRequest {
    /// Flat index of the first item on the requested page.
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }
}

/// Application-supplied source of pages.
///
/// `fetch` must eventually call [`PageCallback::resolve`] with at most
/// `request.page_size` items and the total number of items matching
/// `request.filter`. It may do so before returning or at any later time, from
/// any thread. A callback that is never resolved leaves its page in flight
/// forever.
///
/// Closures with the matching signature implement this trait:
///
/// ```
/// use std::sync::Arc;
/// use combo_cache::fetch::{DataSource, FetchRequest, PageCallback};
///
/// let source: Arc<dyn DataSource<u32>> = Arc::new(|request: FetchRequest, callback: PageCallback<u32>| {
///     let start = request.offset() as u32;
///     let items = (start..start + request.page_size as u32).collect();
///     callback.resolve(items, 1_000);
/// });
/// ```
pub trait DataSource<T>: Send + Sync {
    /// Starts fetching one page.
    fn fetch(&self, request: FetchRequest, callback: PageCallback<T>);
}

impl<T, F> DataSource<T> for F
where
    F: Fn(FetchRequest, PageCallback<T>) + Send + Sync,
{
    fn fetch(&self, request: FetchRequest, callback: PageCallback<T>) {
        self(request, callback)
    }
}
