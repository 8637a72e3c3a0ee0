//! Flat index translation.
//!
//! A virtual list addresses rows by a single flat index. The cache stores rows
//! in fixed-size pages. [`PageIndexer`] converts between the two.

use std::ops::Range;

/// Maps flat row indices to `(page, offset)` pairs for a given page size.
///
/// # Example
///
/// ```
/// use combo_cache::index::PageIndexer;
///
/// let indexer = PageIndexer::new(2);
/// assert_eq!(indexer.to_page(4), 2);
/// assert_eq!(indexer.to_offset(5), 1);
/// assert_eq!(indexer.to_flat(2, 1), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageIndexer {
    page_size: usize,
}

impl PageIndexer {
    /// Creates an indexer.
    ///
    /// `page_size` must be at least 1; zero is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the page containing `flat_index`.
    pub fn to_page(&self, flat_index: usize) -> usize {
        flat_index / self.page_size
    }

    /// Returns the position of `flat_index` within its page.
    pub fn to_offset(&self, flat_index: usize) -> usize {
        flat_index % self.page_size
    }

    /// Returns `(page, offset)` for `flat_index`.
    pub fn locate(&self, flat_index: usize) -> (usize, usize) {
        (self.to_page(flat_index), self.to_offset(flat_index))
    }

    /// Inverse of [`locate`](Self::locate).
    pub fn to_flat(&self, page_index: usize, offset: usize) -> usize {
        page_index * self.page_size + offset
    }

    /// Number of pages needed to hold `size` rows.
    pub fn page_count(&self, size: usize) -> usize {
        size.div_ceil(self.page_size)
    }

    /// Pages touched by a range of flat indices.
    pub fn page_range(&self, rows: Range<usize>) -> Range<usize> {
        if rows.is_empty() {
            return 0..0;
        }
        self.to_page(rows.start)..self.to_page(rows.end - 1) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate() {
        let indexer = PageIndexer::new(50);
        assert_eq!(indexer.locate(0), (0, 0));
        assert_eq!(indexer.locate(49), (0, 49));
        assert_eq!(indexer.locate(50), (1, 0));
        assert_eq!(indexer.locate(123), (2, 23));
    }

    #[test]
    fn test_to_flat_inverts_locate() {
        let indexer = PageIndexer::new(7);
        for flat in [0, 6, 7, 13, 70] {
            let (page, offset) = indexer.locate(flat);
            assert_eq!(indexer.to_flat(page, offset), flat);
        }
    }

    #[test]
    fn test_page_count() {
        let indexer = PageIndexer::new(2);
        assert_eq!(indexer.page_count(0), 0);
        assert_eq!(indexer.page_count(1), 1);
        assert_eq!(indexer.page_count(4), 2);
        assert_eq!(indexer.page_count(5), 3);
    }

    #[test]
    fn test_page_range() {
        let indexer = PageIndexer::new(10);
        assert_eq!(indexer.page_range(0..0), 0..0);
        assert_eq!(indexer.page_range(0..10), 0..1);
        assert_eq!(indexer.page_range(5..25), 0..3);
        assert_eq!(indexer.page_range(20..21), 2..3);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let indexer = PageIndexer::new(0);
        assert_eq!(indexer.page_size(), 1);
        assert_eq!(indexer.to_page(3), 3);
    }
}
