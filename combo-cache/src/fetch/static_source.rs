//! In-memory data source for static item lists.

use std::sync::Arc;

use super::DataSource;
use super::FetchRequest;
use super::PageCallback;

/// Predicate deciding whether an item matches a filter string.
pub type ItemMatcher<T> = Arc<dyn Fn(&T, &str) -> bool + Send + Sync>;

/// Serves pages out of a fixed item list, synchronously.
///
/// With a matcher, non-empty filters select the matching items before
/// paging. Without one the filter is ignored.
///
/// # Example
///
/// ```
/// use combo_cache::fetch::StaticDataSource;
///
/// let source = StaticDataSource::new(vec!["Finland", "France", "Germany"])
///     .with_matcher(|item: &&str, filter: &str| {
///         item.to_lowercase().contains(&filter.to_lowercase())
///     });
/// assert_eq!(source.matching("fr"), vec!["France"]);
/// ```
pub struct StaticDataSource<T> {
    items: Arc<Vec<T>>,
    matcher: Option<ItemMatcher<T>>,
}

impl<T> StaticDataSource<T> {
    /// Creates a source over `items` that ignores filters.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(items),
            matcher: None,
        }
    }

    /// Creates a source over an already shared item list.
    pub fn from_shared(items: Arc<Vec<T>>) -> Self {
        Self {
            items,
            matcher: None,
        }
    }

    /// Sets the filter predicate.
    pub fn with_matcher(mut self, matcher: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    /// Sets or removes the filter predicate.
    pub fn with_optional_matcher(mut self, matcher: Option<ItemMatcher<T>>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Returns all items, unfiltered.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of items, unfiltered.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn filtered<'a>(&'a self, filter: &str) -> Vec<&'a T> {
        match &self.matcher {
            Some(matcher) if !filter.is_empty() => {
                self.items.iter().filter(|&item| matcher(item, filter)).collect()
            }
            _ => self.items.iter().collect(),
        }
    }
}

impl<T: Clone> StaticDataSource<T> {
    /// Every item matching `filter`, in order.
    pub fn matching(&self, filter: &str) -> Vec<T> {
        self.filtered(filter).into_iter().cloned().collect()
    }
}

impl<T: Clone + Send + Sync> DataSource<T> for StaticDataSource<T> {
    fn fetch(&self, request: FetchRequest, callback: PageCallback<T>) {
        let matching = self.filtered(&request.filter);
        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(request.offset())
            .take(request.page_size)
            .cloned()
            .collect();
        callback.resolve(page, total);
    }
}

impl<T> std::fmt::Debug for StaticDataSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticDataSource")
            .field("len", &self.items.len())
            .field("has_matcher", &self.matcher.is_some())
            .finish()
    }
}
