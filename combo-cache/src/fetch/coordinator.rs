//! Fetch coordination.

use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use log::debug;
use log::trace;
use log::warn;

use crate::cache::PageCache;
use crate::error::ConfigError;
use crate::event::CacheEvent;
use crate::event::Listener;
use crate::event::ListenerId;
use crate::event::Listeners;
use crate::index::PageIndexer;
use crate::slot::Slot;

use super::DataSource;
use super::FetchRequest;
use super::Generation;
use super::PageCallback;

/// Mutable coordinator state, guarded by a single mutex.
struct State<T> {
    cache: PageCache<T>,
    /// Pages with a fetch in flight for the current generation.
    pending: BTreeSet<usize>,
    generation: Generation,
    filter: String,
    source: Option<Arc<dyn DataSource<T>>>,
    /// Whether any page has been stored since the last clear.
    loaded_since_clear: bool,
    disposed: bool,
}

impl<T> State<T> {
    fn is_pristine(&self) -> bool {
        self.cache.is_empty() && self.pending.is_empty()
    }

    /// Empties the cache and starts a new generation.
    ///
    /// Returns the events to emit, or nothing if the state was already pristine.
    fn clear(&mut self) -> Vec<CacheEvent> {
        if self.is_pristine() {
            return Vec::new();
        }

        let was_loading = !self.pending.is_empty();
        self.generation = self.generation.next();
        self.cache.clear();
        self.pending.clear();
        self.loaded_since_clear = false;
        debug!("[fetch] cache cleared, now {}", self.generation);

        let mut events = vec![CacheEvent::Cleared {
            generation: self.generation,
        }];
        if was_loading {
            events.push(CacheEvent::LoadingChanged(false));
        }
        events
    }
}

/// Events waiting for delivery, in the order they were produced.
#[derive(Default)]
struct Dispatch {
    queue: VecDeque<CacheEvent>,
    /// Set while one thread is delivering the queue.
    draining: bool,
    /// Loading flag listeners saw last.
    loading: bool,
}

/// Clears the draining flag if a listener panics.
struct DrainGuard<'a>(&'a Mutex<Dispatch>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).draining = false;
        }
    }
}

pub(crate) struct Shared<T> {
    state: Mutex<State<T>>,
    listeners: Mutex<Listeners>,
    dispatch: Mutex<Dispatch>,
}

impl<T> Shared<T> {
    fn state(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self) -> MutexGuard<'_, Dispatch> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues events and delivers them. Must be called with no lock held.
    ///
    /// Only one caller delivers at a time. Events emitted while a delivery is
    /// running, including from inside a listener, are appended to the queue
    /// and delivered by that caller after the current event.
    ///
    /// `LoadingChanged` carries the loading state at delivery time and is
    /// skipped when it would repeat what listeners saw last, so the last one
    /// delivered always agrees with `is_loading`.
    fn emit(&self, events: Vec<CacheEvent>) {
        if events.is_empty() {
            return;
        }
        {
            let mut dispatch = self.dispatch();
            dispatch.queue.extend(events);
            if dispatch.draining {
                return;
            }
            dispatch.draining = true;
        }

        let _guard = DrainGuard(&self.dispatch);
        loop {
            let event = {
                let mut dispatch = self.dispatch();
                let Some(event) = dispatch.queue.pop_front() else {
                    dispatch.draining = false;
                    return;
                };
                event
            };
            let event = match event {
                CacheEvent::LoadingChanged(_) => {
                    let loading = !self.state().pending.is_empty();
                    let mut dispatch = self.dispatch();
                    if dispatch.loading == loading {
                        trace!("[fetch] loading still {}, not repeated", loading);
                        continue;
                    }
                    dispatch.loading = loading;
                    CacheEvent::LoadingChanged(loading)
                }
                event => event,
            };

            trace!("[fetch] emit {:?}", event);
            let listeners = self.listeners().snapshot();
            for listener in &listeners {
                listener(&event);
            }
        }
    }

    /// Merges a completed fetch into the cache.
    pub(crate) fn complete(
        &self,
        page_index: usize,
        generation: Generation,
        mut items: Vec<T>,
        total_size: usize,
    ) {
        let events = {
            let mut state = self.state();
            if state.disposed || generation != state.generation {
                debug!(
                    "[fetch] discarding stale page {} ({}, current {})",
                    page_index, generation, state.generation
                );
                return;
            }

            let page_size = state.cache.page_size();
            if items.len() > page_size {
                warn!(
                    "[fetch] page {} returned {} items for page size {}, truncating",
                    page_index,
                    items.len(),
                    page_size
                );
                items.truncate(page_size);
            }

            state.pending.remove(&page_index);
            let size_changed = state.cache.set_size(Some(total_size));
            state.cache.set_page(page_index, items);
            let first_since_clear = !state.loaded_since_clear;
            state.loaded_since_clear = true;
            debug!(
                "[fetch] page {} loaded, size {} ({} still pending)",
                page_index,
                total_size,
                state.pending.len()
            );

            let mut events = Vec::with_capacity(3);
            if size_changed {
                events.push(CacheEvent::SizeChanged {
                    size: Some(total_size),
                });
            }
            events.push(CacheEvent::PageLoaded {
                page_index,
                size: total_size,
                first_since_clear,
            });
            if state.pending.is_empty() {
                events.push(CacheEvent::LoadingChanged(false));
            }
            events
        };
        self.emit(events);
    }
}

/// Issues page fetches and merges their results into a [`PageCache`].
///
/// The coordinator exclusively owns the cache. Readers get copies of what is
/// cached; all mutation goes through the methods below.
///
/// State machine: `Idle` while nothing is in flight, `Fetching` otherwise.
/// Clearing is an event, not a state: it starts a new [`Generation`] and
/// returns to `Idle` immediately. Requests still in flight from the old
/// generation are discarded when they complete.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use combo_cache::fetch::{FetchCoordinator, FetchRequest, PageCallback};
/// use combo_cache::Slot;
///
/// let coordinator = FetchCoordinator::new(2);
/// coordinator.set_source(Some(Arc::new(|request: FetchRequest, callback: PageCallback<char>| {
///     let items = ['a', 'b', 'c', 'd', 'e'];
///     let start = request.offset().min(items.len());
///     let end = (start + request.page_size).min(items.len());
///     callback.resolve(items[start..end].to_vec(), items.len());
/// })));
///
/// coordinator.ensure_loaded(0);
/// assert_eq!(coordinator.size(), Some(5));
/// assert_eq!(coordinator.item(1), Some(Slot::Loaded('b')));
/// assert_eq!(coordinator.item(2), Some(Slot::Placeholder));
/// ```
pub struct FetchCoordinator<T> {
    shared: Arc<Shared<T>>,
}

impl<T> FetchCoordinator<T> {
    /// Creates an idle coordinator with no data source.
    pub fn new(page_size: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    cache: PageCache::new(page_size),
                    pending: BTreeSet::new(),
                    generation: Generation::default(),
                    filter: String::new(),
                    source: None,
                    loaded_since_clear: false,
                    disposed: false,
                }),
                listeners: Mutex::new(Listeners::default()),
                dispatch: Mutex::new(Dispatch::default()),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Registers a listener for cache events.
    pub fn subscribe(&self, listener: impl Fn(&CacheEvent) + Send + Sync + 'static) -> ListenerId {
        let listener: Listener = Arc::new(listener);
        self.shared.listeners().add(listener)
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.listeners().remove(id)
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Makes sure `page_index` is cached or being fetched.
    ///
    /// Does nothing if the page is already cached, already in flight, lies
    /// beyond the known size, or no data source is set.
    pub fn ensure_loaded(&self, page_index: usize) {
        self.request(page_index, None);
    }

    /// Makes sure every page touched by `rows` is cached or being fetched,
    /// plus up to `prefetch_pages` pages after the last one.
    ///
    /// Rows are clamped to the known size and mapped to pages under the same
    /// lock, so a concurrent page size change cannot mix two page sizes.
    /// Nothing happens while the size is unknown.
    pub fn ensure_rows_loaded(&self, rows: Range<usize>, prefetch_pages: usize) {
        let (pages, generation) = {
            let state = self.shared.state();
            let Some(size) = state.cache.size() else {
                return;
            };
            let indexer = state.cache.indexer();
            let pages = indexer.page_range(rows.start.min(size)..rows.end.min(size));
            if pages.is_empty() {
                return;
            }
            let last = pages
                .end
                .saturating_add(prefetch_pages)
                .min(indexer.page_count(size));
            (pages.start..last, state.generation)
        };

        for page_index in pages {
            if !self.request(page_index, Some(generation)) {
                break;
            }
        }
    }

    /// Issues a fetch for `page_index` if needed.
    ///
    /// With `expected` set, nothing is issued once the generation has moved
    /// on. Returns `false` in that case.
    fn request(&self, page_index: usize, expected: Option<Generation>) -> bool {
        let (source, request, callback, events) = {
            let mut state = self.shared.state();
            if expected.is_some_and(|generation| generation != state.generation) {
                debug!(
                    "[fetch] not requesting page {}, {} is gone",
                    page_index, state.generation
                );
                return false;
            }
            if state.disposed
                || state.cache.contains_page(page_index)
                || state.pending.contains(&page_index)
                || state.cache.is_out_of_range(page_index)
            {
                return true;
            }
            let Some(source) = state.source.clone() else {
                trace!("[fetch] no data source, not loading page {}", page_index);
                return true;
            };

            let was_idle = state.pending.is_empty();
            state.pending.insert(page_index);
            let generation = state.generation;
            let request = FetchRequest {
                page_index,
                page_size: state.cache.page_size(),
                filter: state.filter.clone(),
            };
            debug!("[fetch] requesting {:?} ({})", request, generation);

            let mut events = Vec::with_capacity(2);
            if was_idle {
                events.push(CacheEvent::LoadingChanged(true));
            }
            events.push(CacheEvent::PageRequested {
                page_index,
                generation,
            });
            let callback = PageCallback::new(Arc::downgrade(&self.shared), page_index, generation);
            (source, request, callback, events)
        };

        self.shared.emit(events);
        source.fetch(request, callback);
        true
    }

    /// Loads page 0 when nothing is known about the result set yet.
    ///
    /// Used when the owning widget opens. Leftover state is cleared first.
    pub fn load_first_page(&self) {
        {
            let state = self.shared.state();
            if state.disposed
                || state.cache.size().is_some()
                || state.cache.contains_page(0)
                || state.pending.contains(&0)
            {
                return;
            }
        }
        self.clear();
        self.ensure_loaded(0);
    }

    /// Returns `true` while at least one fetch is in flight.
    pub fn is_loading(&self) -> bool {
        !self.shared.state().pending.is_empty()
    }

    /// Pages with a fetch in flight, ascending.
    pub fn pending_pages(&self) -> Vec<usize> {
        self.shared.state().pending.iter().copied().collect()
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Drops everything cached and starts a new generation.
    ///
    /// A no-op, emitting nothing, when the cache is already empty and idle.
    pub fn clear(&self) {
        let events = self.shared.state().clear();
        self.shared.emit(events);
    }

    /// Replaces the data source. Any cached data is cleared.
    pub fn set_source(&self, source: Option<Arc<dyn DataSource<T>>>) {
        let events = self.swap_source(source);
        self.notify(events);
    }

    /// Replaces the data source without notifying listeners.
    ///
    /// Lets the controller change its own source bookkeeping and the
    /// coordinator's source under one lock. The returned events go to
    /// [`notify`](Self::notify) after that lock is released.
    pub(crate) fn swap_source(&self, source: Option<Arc<dyn DataSource<T>>>) -> Vec<CacheEvent> {
        let mut state = self.shared.state();
        if state.disposed {
            return Vec::new();
        }
        state.source = source;
        state.clear()
    }

    /// Delivers events returned by [`swap_source`](Self::swap_source).
    pub(crate) fn notify(&self, events: Vec<CacheEvent>) {
        self.shared.emit(events);
    }

    /// Returns `true` if a data source is set.
    pub fn has_source(&self) -> bool {
        self.shared.state().source.is_some()
    }

    /// Changes the filter. A different filter clears the cache.
    pub fn set_filter(&self, filter: impl Into<String>) {
        let filter = filter.into();
        let events = {
            let mut state = self.shared.state();
            if state.disposed || state.filter == filter {
                return;
            }
            debug!("[fetch] filter changed to {:?}", filter);
            state.filter = filter;
            state.clear()
        };
        self.shared.emit(events);
    }

    /// Returns the current filter.
    pub fn filter(&self) -> String {
        self.shared.state().filter.clone()
    }

    /// Changes the page size. A different size clears the cache.
    ///
    /// Zero is rejected and the previous size stays in effect.
    pub fn set_page_size(&self, page_size: usize) -> Result<(), ConfigError> {
        let events = {
            let mut state = self.shared.state();
            let current = state.cache.page_size();
            if page_size == 0 {
                return Err(ConfigError::invalid_page_size(page_size, current));
            }
            if state.disposed || page_size == current {
                return Ok(());
            }
            debug!("[fetch] page size {} -> {}", current, page_size);
            let events = state.clear();
            state.cache.set_page_size(page_size);
            events
        };
        self.shared.emit(events);
        Ok(())
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.shared.state().cache.page_size()
    }

    /// Returns the flat index translator for the current page size.
    pub fn indexer(&self) -> PageIndexer {
        self.shared.state().cache.indexer()
    }

    /// Returns the current generation.
    pub fn generation(&self) -> Generation {
        self.shared.state().generation
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Ends the coordinator's life.
    ///
    /// Everything cached is dropped, listeners and the data source are
    /// released, and results arriving afterwards are discarded.
    pub fn dispose(&self) {
        {
            let mut state = self.shared.state();
            if state.disposed {
                return;
            }
            state.clear();
            state.generation = state.generation.next();
            state.source = None;
            state.disposed = true;
        }
        self.shared.listeners().clear();
        debug!("[fetch] coordinator disposed");
    }

    /// Returns `true` once [`dispose`](Self::dispose) was called.
    pub fn is_disposed(&self) -> bool {
        self.shared.state().disposed
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    /// Returns the total item count, if known.
    pub fn size(&self) -> Option<usize> {
        self.shared.state().cache.size()
    }

    /// Indices of cached pages, ascending.
    pub fn loaded_pages(&self) -> Vec<usize> {
        self.shared.state().cache.loaded_pages()
    }
}

impl<T: Clone> FetchCoordinator<T> {
    /// Returns a copy of a cached page.
    pub fn page(&self, page_index: usize) -> Option<Vec<T>> {
        self.shared.state().cache.page(page_index).map(<[T]>::to_vec)
    }

    /// Returns a single row, or `None` outside the known size.
    pub fn item(&self, flat_index: usize) -> Option<Slot<T>> {
        self.shared.state().cache.item(flat_index).map(Slot::cloned)
    }

    /// Every row in `0..size`, placeholders for rows not loaded.
    pub fn flattened_items(&self) -> Vec<Slot<T>> {
        self.shared.state().cache.flattened_items()
    }
}

impl<T> std::fmt::Debug for FetchCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state();
        f.debug_struct("FetchCoordinator")
            .field("page_size", &state.cache.page_size())
            .field("size", &state.cache.size())
            .field("loaded_pages", &state.cache.loaded_pages())
            .field("pending", &state.pending)
            .field("generation", &state.generation)
            .field("filter", &state.filter)
            .field("disposed", &state.disposed)
            .finish()
    }
}
