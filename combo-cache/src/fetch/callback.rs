//! Completion handle passed to data sources.

use std::sync::Weak;

use log::debug;

use super::Generation;
use super::coordinator::Shared;

/// One-shot completion handle for a page fetch.
///
/// Resolving consumes the handle, so a page can be delivered at most once.
/// The handle only weakly references the coordinator: if the coordinator is
/// dropped before the fetch completes, the result is discarded.
pub struct PageCallback<T> {
    shared: Weak<Shared<T>>,
    page_index: usize,
    generation: Generation,
}

impl<T> PageCallback<T> {
    pub(crate) fn new(shared: Weak<Shared<T>>, page_index: usize, generation: Generation) -> Self {
        Self {
            shared,
            page_index,
            generation,
        }
    }

    /// The page this callback delivers.
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// The generation the request was issued in.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Delivers the page contents and the total item count.
    pub fn resolve(self, items: Vec<T>, total_size: usize) {
        match self.shared.upgrade() {
            Some(shared) => shared.complete(self.page_index, self.generation, items, total_size),
            None => debug!(
                "[fetch] coordinator gone, dropping page {} ({})",
                self.page_index, self.generation
            ),
        }
    }
}

impl<T> std::fmt::Debug for PageCallback<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCallback")
            .field("page_index", &self.page_index)
            .field("generation", &self.generation)
            .finish()
    }
}
