//! Sparse page cache
//!
//! Stores pages of items keyed by page index together with the total item
//! count, and answers "what do I currently know about row N". The cache does
//! no fetching of its own; [`FetchCoordinator`](crate::fetch::FetchCoordinator)
//! is its only writer.

mod config;

pub use config::*;

use std::collections::BTreeMap;

use crate::index::PageIndexer;
use crate::slot::Slot;

/// Sparse mapping from page index to page contents plus the total size.
///
/// `size` is `None` until the first page arrives. `Some(0)` means the data
/// source confirmed an empty result, which is not the same as unknown.
///
/// # Example
///
/// ```
/// use combo_cache::cache::PageCache;
/// use combo_cache::Slot;
///
/// let mut cache = PageCache::new(2);
/// cache.set_size(Some(3));
/// cache.set_page(0, vec!["a", "b"]);
///
/// assert_eq!(
///     cache.flattened_items(),
///     vec![Slot::Loaded("a"), Slot::Loaded("b"), Slot::Placeholder],
/// );
/// ```
#[derive(Debug, Clone)]
pub struct PageCache<T> {
    indexer: PageIndexer,
    pages: BTreeMap<usize, Vec<T>>,
    size: Option<usize>,
}

impl<T> PageCache<T> {
    /// Creates an empty cache with the given page size.
    pub fn new(page_size: usize) -> Self {
        Self {
            indexer: PageIndexer::new(page_size),
            pages: BTreeMap::new(),
            size: None,
        }
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.indexer.page_size()
    }

    /// Returns the index translator for the current page size.
    pub fn indexer(&self) -> PageIndexer {
        self.indexer
    }

    /// Changes the page size and drops everything cached.
    ///
    /// Existing page boundaries are meaningless under a new size. Returns
    /// `true` if the size actually changed.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if page_size == self.indexer.page_size() {
            return false;
        }
        self.indexer = PageIndexer::new(page_size);
        self.clear();
        true
    }

    /// Returns the total item count, if known.
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Updates the total item count. Returns `true` if it changed.
    pub fn set_size(&mut self, size: Option<usize>) -> bool {
        if self.size == size {
            return false;
        }
        self.size = size;
        true
    }

    /// Number of pages covering the known size, or `None` if unknown.
    pub fn page_count(&self) -> Option<usize> {
        self.size.map(|size| self.indexer.page_count(size))
    }

    /// Returns `true` if `page_index` lies beyond the known size.
    pub fn is_out_of_range(&self, page_index: usize) -> bool {
        self.page_count().is_some_and(|count| page_index >= count)
    }

    /// Returns a cached page.
    pub fn page(&self, page_index: usize) -> Option<&[T]> {
        self.pages.get(&page_index).map(Vec::as_slice)
    }

    /// Returns `true` if the page is cached.
    pub fn contains_page(&self, page_index: usize) -> bool {
        self.pages.contains_key(&page_index)
    }

    /// Replaces the page at `page_index`.
    pub fn set_page(&mut self, page_index: usize, items: Vec<T>) {
        self.pages.insert(page_index, items);
    }

    /// Indices of cached pages in ascending order.
    pub fn loaded_pages(&self) -> Vec<usize> {
        self.pages.keys().copied().collect()
    }

    /// Returns `true` if nothing is cached and the size is unknown.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.size.is_none()
    }

    /// Drops all pages and forgets the size.
    ///
    /// Returns `false` without touching anything if the cache was already empty.
    pub fn clear(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.pages.clear();
        self.size = None;
        true
    }

    /// Looks up a single row.
    ///
    /// Returns `None` when the index is outside the known size, and a
    /// placeholder when the row is in range but not loaded.
    pub fn item(&self, flat_index: usize) -> Option<Slot<&T>> {
        let size = self.size?;
        if flat_index >= size {
            return None;
        }
        let (page, offset) = self.indexer.locate(flat_index);
        Some(
            self.pages
                .get(&page)
                .and_then(|items| items.get(offset))
                .into(),
        )
    }
}

impl<T: Clone> PageCache<T> {
    /// Produces every row in `0..size`, with placeholders for missing data.
    ///
    /// The result is empty while the size is unknown and always exactly `size`
    /// long once it is known.
    pub fn flattened_items(&self) -> Vec<Slot<T>> {
        let Some(size) = self.size else {
            return Vec::new();
        };

        let page_size = self.indexer.page_size();
        let mut items = Vec::with_capacity(size);
        for page_index in 0..self.indexer.page_count(size) {
            let start = page_index * page_size;
            let len = page_size.min(size - start);
            let page = self.pages.get(&page_index).map(Vec::as_slice).unwrap_or(&[]);
            items.extend((0..len).map(|offset| Slot::from(page.get(offset).cloned())));
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_size_flattens_to_nothing() {
        let mut cache = PageCache::new(2);
        cache.set_page(0, vec![1, 2]);
        assert!(cache.flattened_items().is_empty());
        assert_eq!(cache.item(0), None);
    }

    #[test]
    fn test_zero_size_is_not_unknown() {
        let mut cache = PageCache::<u8>::new(2);
        assert!(cache.set_size(Some(0)));
        assert_eq!(cache.size(), Some(0));
        assert_eq!(cache.page_count(), Some(0));
        assert!(!cache.is_empty());
        assert!(cache.is_out_of_range(0));
    }

    #[test]
    fn test_flattening_fills_gaps_and_short_pages() {
        let mut cache = PageCache::new(3);
        cache.set_size(Some(8));
        cache.set_page(0, vec!["a", "b"]);
        cache.set_page(2, vec!["g", "h"]);

        let items = cache.flattened_items();
        assert_eq!(items.len(), 8);
        assert_eq!(items[0], Slot::Loaded("a"));
        assert_eq!(items[1], Slot::Loaded("b"));
        assert_eq!(items[2], Slot::Placeholder);
        assert!(items[3..6].iter().all(Slot::is_placeholder));
        assert_eq!(items[6], Slot::Loaded("g"));
        assert_eq!(items[7], Slot::Loaded("h"));
    }

    #[test]
    fn test_item_lookup() {
        let mut cache = PageCache::new(2);
        cache.set_size(Some(3));
        cache.set_page(1, vec!["c"]);
        assert_eq!(cache.item(0), Some(Slot::Placeholder));
        assert_eq!(cache.item(2), Some(Slot::Loaded(&"c")));
        assert_eq!(cache.item(3), None);
    }

    #[test]
    fn test_set_page_replaces() {
        let mut cache = PageCache::new(2);
        cache.set_page(0, vec![1, 2]);
        cache.set_page(0, vec![3]);
        assert_eq!(cache.page(0), Some(&[3][..]));
        assert_eq!(cache.loaded_pages(), vec![0]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut cache = PageCache::new(2);
        assert!(!cache.clear());

        cache.set_size(Some(4));
        cache.set_page(1, vec![1, 2]);
        assert!(cache.clear());
        assert_eq!(cache.size(), None);
        assert!(cache.loaded_pages().is_empty());
        assert!(!cache.clear());
    }

    #[test]
    fn test_page_size_change_clears() {
        let mut cache = PageCache::new(2);
        cache.set_size(Some(4));
        cache.set_page(0, vec![1, 2]);

        assert!(!cache.set_page_size(2));
        assert_eq!(cache.size(), Some(4));

        assert!(cache.set_page_size(4));
        assert_eq!(cache.page_size(), 4);
        assert_eq!(cache.size(), None);
        assert!(cache.page(0).is_none());
    }
}
