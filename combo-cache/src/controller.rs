//! Widget-facing controller.

use std::ops::Range;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use log::debug;

use crate::cache::ControllerConfig;
use crate::error::ConfigError;
use crate::error::Error;
use crate::error::SourceKind;
use crate::event::CacheEvent;
use crate::event::ListenerId;
use crate::fetch::DataSource;
use crate::fetch::FetchCoordinator;
use crate::fetch::Generation;
use crate::fetch::ItemMatcher;
use crate::fetch::StaticDataSource;
use crate::index::PageIndexer;
use crate::slot::Slot;

/// Where the controller's items come from.
enum ItemSource<T> {
    None,
    Items(Arc<Vec<T>>),
    DataSource(Arc<dyn DataSource<T>>),
}

impl<T> ItemSource<T> {
    fn kind(&self) -> Option<SourceKind> {
        match self {
            Self::None => None,
            Self::Items(_) => Some(SourceKind::Items),
            Self::DataSource(_) => Some(SourceKind::DataSource),
        }
    }
}

struct SourceState<T> {
    source: ItemSource<T>,
    matcher: Option<ItemMatcher<T>>,
}

/// Lazy paged item provider owned by a list-style widget.
///
/// Composes a [`FetchCoordinator`] (which owns the page cache) with flat index
/// translation and the choice between a static item list and an application
/// data source. All methods take `&self`, so the controller can be shared
/// with event listeners through an `Arc`.
///
/// # Example
///
/// ```
/// use combo_cache::{ControllerConfig, DataProviderController, Slot};
///
/// let controller = DataProviderController::new(ControllerConfig::default().with_page_size(2))?;
/// controller.set_items(vec!["a", "b", "c", "d", "e"])?;
///
/// controller.load_first_page();
/// assert_eq!(controller.size(), Some(5));
///
/// controller.ensure_flat_index_loaded(4);
/// assert_eq!(controller.item(4), Some(Slot::Loaded("e")));
/// assert_eq!(controller.item(2), Some(Slot::Placeholder));
/// # Ok::<(), combo_cache::Error>(())
/// ```
pub struct DataProviderController<T> {
    coordinator: FetchCoordinator<T>,
    source: Mutex<SourceState<T>>,
    prefetch_pages: AtomicUsize,
}

impl<T> DataProviderController<T> {
    /// Creates a controller from a validated config.
    pub fn new(config: ControllerConfig) -> Result<Self, Error> {
        config.validate()?;
        let coordinator = FetchCoordinator::new(config.page_size);
        coordinator.set_filter(config.filter);
        Ok(Self {
            coordinator,
            source: Mutex::new(SourceState {
                source: ItemSource::None,
                matcher: None,
            }),
            prefetch_pages: AtomicUsize::new(config.prefetch_pages),
        })
    }

    fn source_state(&self) -> MutexGuard<'_, SourceState<T>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the source lock, failing once disposed.
    ///
    /// Source bookkeeping and the coordinator's source change together under
    /// this lock. Listeners are notified only after it is released.
    fn active_source_state(&self) -> Result<MutexGuard<'_, SourceState<T>>, Error> {
        let state = self.source_state();
        self.ensure_active()?;
        Ok(state)
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if self.coordinator.is_disposed() {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    /// The underlying coordinator.
    pub fn coordinator(&self) -> &FetchCoordinator<T> {
        &self.coordinator
    }

    // -------------------------------------------------------------------------
    // Item source
    // -------------------------------------------------------------------------

    /// Uses an application data source.
    ///
    /// Rejected while a static item list is set. Replacing a data source
    /// clears the cache.
    pub fn set_data_source(&self, source: Arc<dyn DataSource<T>>) -> Result<(), Error> {
        let events = {
            let mut state = self.active_source_state()?;
            if let ItemSource::Items(_) = state.source {
                return Err(ConfigError::conflicting_source(SourceKind::DataSource, SourceKind::Items).into());
            }
            debug!("[controller] data source set");
            state.source = ItemSource::DataSource(Arc::clone(&source));
            self.coordinator.swap_source(Some(source))
        };
        self.coordinator.notify(events);
        Ok(())
    }

    /// Removes the data source, if one is set.
    pub fn clear_data_source(&self) {
        self.clear_source(SourceKind::DataSource);
    }

    /// Removes the static item list, if one is set.
    pub fn clear_items(&self) {
        self.clear_source(SourceKind::Items);
    }

    fn clear_source(&self, kind: SourceKind) {
        let events = {
            let mut state = self.source_state();
            if state.source.kind() != Some(kind) {
                return;
            }
            debug!("[controller] {} cleared", kind);
            state.source = ItemSource::None;
            self.coordinator.swap_source(None)
        };
        self.coordinator.notify(events);
    }

    /// Which kind of source is active, if any.
    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source_state().source.kind()
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Changes the page size. A different size clears the cache.
    pub fn set_page_size(&self, page_size: usize) -> Result<(), Error> {
        self.ensure_active()?;
        Ok(self.coordinator.set_page_size(page_size)?)
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.coordinator.page_size()
    }

    /// Changes the filter. A different filter clears the cache.
    pub fn set_filter(&self, filter: impl Into<String>) {
        self.coordinator.set_filter(filter);
    }

    /// Returns the current filter.
    pub fn filter(&self) -> String {
        self.coordinator.filter()
    }

    /// Sets how many pages past a requested row are loaded as well.
    pub fn set_prefetch_pages(&self, pages: usize) {
        self.prefetch_pages.store(pages, Ordering::SeqCst);
    }

    /// Returns the prefetch distance in pages.
    pub fn prefetch_pages(&self) -> usize {
        self.prefetch_pages.load(Ordering::SeqCst)
    }

    /// Drops all cached data. Pending results will be discarded.
    pub fn clear_cache(&self) {
        self.coordinator.clear();
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Loads page 0 if nothing is known yet. Call when the widget opens.
    pub fn load_first_page(&self) {
        self.coordinator.load_first_page();
    }

    /// Makes sure the page holding `flat_index` is loaded or loading.
    ///
    /// Indices outside `0..size`, or any index while the size is unknown,
    /// are ignored.
    pub fn ensure_flat_index_loaded(&self, flat_index: usize) {
        self.ensure_range_loaded(flat_index..flat_index.saturating_add(1));
    }

    /// Makes sure every page touched by `rows` is loaded or loading.
    ///
    /// The range is clamped to the known size; nothing happens while the size
    /// is unknown.
    pub fn ensure_range_loaded(&self, rows: Range<usize>) {
        self.coordinator.ensure_rows_loaded(rows, self.prefetch_pages());
    }

    /// Returns `true` while a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading()
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    /// Total number of items, `None` until the first page arrives.
    pub fn size(&self) -> Option<usize> {
        self.coordinator.size()
    }

    /// Flat index translator for the current page size.
    pub fn indexer(&self) -> PageIndexer {
        self.coordinator.indexer()
    }

    /// The current generation.
    pub fn generation(&self) -> Generation {
        self.coordinator.generation()
    }

    /// Indices of cached pages.
    pub fn loaded_pages(&self) -> Vec<usize> {
        self.coordinator.loaded_pages()
    }

    // -------------------------------------------------------------------------
    // Events and lifecycle
    // -------------------------------------------------------------------------

    /// Registers a listener for cache events.
    pub fn subscribe(&self, listener: impl Fn(&CacheEvent) + Send + Sync + 'static) -> ListenerId {
        self.coordinator.subscribe(listener)
    }

    /// Removes a listener.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.coordinator.unsubscribe(id)
    }

    /// Releases the source and listeners; later results are discarded.
    pub fn dispose(&self) {
        let mut state = self.source_state();
        state.source = ItemSource::None;
        self.coordinator.dispose();
    }

    /// Returns `true` once disposed.
    pub fn is_disposed(&self) -> bool {
        self.coordinator.is_disposed()
    }
}

impl<T: Clone> DataProviderController<T> {
    /// Every row in `0..size`, placeholders for rows not loaded.
    pub fn flattened_items(&self) -> Vec<Slot<T>> {
        self.coordinator.flattened_items()
    }

    /// A single row, `None` outside the known size.
    pub fn item(&self, flat_index: usize) -> Option<Slot<T>> {
        self.coordinator.item(flat_index)
    }
}

impl<T: Clone + Send + Sync + 'static> DataProviderController<T> {
    /// Uses a static item list, paged and filtered in memory.
    ///
    /// Rejected while a data source is set.
    pub fn set_items(&self, items: Vec<T>) -> Result<(), Error> {
        let events = {
            let mut state = self.active_source_state()?;
            if let ItemSource::DataSource(_) = state.source {
                return Err(ConfigError::conflicting_source(SourceKind::Items, SourceKind::DataSource).into());
            }
            debug!("[controller] static items set ({} items)", items.len());
            let items = Arc::new(items);
            state.source = ItemSource::Items(Arc::clone(&items));
            let source = static_source(items, state.matcher.clone());
            self.coordinator.swap_source(Some(source))
        };
        self.coordinator.notify(events);
        Ok(())
    }

    /// Sets the predicate used to filter static items.
    ///
    /// Without one, the filter does not narrow static items.
    pub fn set_item_matcher(&self, matcher: impl Fn(&T, &str) -> bool + Send + Sync + 'static) {
        let matcher: ItemMatcher<T> = Arc::new(matcher);
        let events = {
            let mut state = self.source_state();
            state.matcher = Some(Arc::clone(&matcher));
            match &state.source {
                ItemSource::Items(items) => {
                    let source = static_source(Arc::clone(items), Some(matcher));
                    self.coordinator.swap_source(Some(source))
                }
                _ => Vec::new(),
            }
        };
        self.coordinator.notify(events);
    }
}

fn static_source<T: Clone + Send + Sync + 'static>(
    items: Arc<Vec<T>>,
    matcher: Option<ItemMatcher<T>>,
) -> Arc<dyn DataSource<T>> {
    Arc::new(StaticDataSource::from_shared(items).with_optional_matcher(matcher))
}

impl<T> std::fmt::Debug for DataProviderController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataProviderController")
            .field("coordinator", &self.coordinator)
            .field("source", &self.source_kind())
            .field("prefetch_pages", &self.prefetch_pages())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(page_size: usize) -> DataProviderController<u32> {
        DataProviderController::new(ControllerConfig::new().with_page_size(page_size)).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = DataProviderController::<u32>::new(ControllerConfig::new().with_page_size(0));
        assert!(matches!(
            result.unwrap_err(),
            Error::Config(ConfigError::InvalidPageSize { requested: 0, .. })
        ));
    }

    #[test]
    fn test_initial_filter_from_config() {
        let controller =
            DataProviderController::<u32>::new(ControllerConfig::new().with_filter("abc")).unwrap();
        assert_eq!(controller.filter(), "abc");
    }

    #[test]
    fn test_items_then_data_source_conflict() {
        let controller = controller(10);
        controller.set_items(vec![1, 2, 3]).unwrap();
        let err = controller
            .set_data_source(Arc::new(|_: crate::fetch::FetchRequest, _: crate::fetch::PageCallback<u32>| {}))
            .unwrap_err();
        assert_eq!(
            err,
            Error::Config(ConfigError::conflicting_source(
                SourceKind::DataSource,
                SourceKind::Items
            ))
        );
        assert_eq!(controller.source_kind(), Some(SourceKind::Items));
    }

    #[test]
    fn test_clear_items_allows_data_source() {
        let controller = controller(10);
        controller.set_items(vec![1]).unwrap();
        controller.clear_items();
        assert_eq!(controller.source_kind(), None);
        controller
            .set_data_source(Arc::new(|_: crate::fetch::FetchRequest, _: crate::fetch::PageCallback<u32>| {}))
            .unwrap();
        assert_eq!(controller.source_kind(), Some(SourceKind::DataSource));
    }

    #[test]
    fn test_matcher_narrows_static_items() {
        let controller = controller(10);
        controller.set_items((1..=20).collect()).unwrap();
        controller.set_item_matcher(|item, filter| item.to_string().starts_with(filter));
        controller.set_filter("1");
        controller.load_first_page();

        let loaded: Vec<u32> = controller
            .flattened_items()
            .into_iter()
            .filter_map(Slot::loaded)
            .collect();
        assert_eq!(loaded, vec![1, 10, 11, 12, 13, 14, 15, 16, 17, 18]);
        assert_eq!(controller.size(), Some(11));
    }

    #[test]
    fn test_prefetch_loads_following_pages() {
        let controller = controller(2);
        controller.set_items((0..10).collect()).unwrap();
        controller.load_first_page();
        controller.set_prefetch_pages(2);

        controller.ensure_flat_index_loaded(4);
        assert_eq!(controller.loaded_pages(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_unbounded_prefetch_stops_at_last_page() {
        let controller = DataProviderController::<u32>::new(
            ControllerConfig::new()
                .with_page_size(2)
                .with_prefetch_pages(usize::MAX),
        )
        .unwrap();
        controller.set_items((0..10).collect()).unwrap();
        controller.load_first_page();

        controller.ensure_flat_index_loaded(4);
        assert_eq!(controller.loaded_pages(), vec![0, 2, 3, 4]);
        controller.ensure_flat_index_loaded(usize::MAX);
        assert_eq!(controller.loaded_pages(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_range_is_clamped_to_size() {
        let controller = controller(3);
        controller.set_items((0..7).collect()).unwrap();
        controller.ensure_range_loaded(0..100);
        assert!(controller.loaded_pages().is_empty());

        controller.load_first_page();
        controller.ensure_range_loaded(4..100);
        assert_eq!(controller.loaded_pages(), vec![0, 1, 2]);
        assert_eq!(controller.flattened_items().len(), 7);
        assert!(controller.flattened_items().iter().all(Slot::is_loaded));
    }

    #[test]
    fn test_source_kind_matches_coordinator_under_contention() {
        let controller = controller(2);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..500 {
                    let _ = controller.set_items(vec![1, 2, 3]);
                    controller.clear_items();
                }
            });
            scope.spawn(|| {
                for _ in 0..500 {
                    controller.clear_data_source();
                    let _ = controller.set_data_source(Arc::new(
                        |_: crate::fetch::FetchRequest, _: crate::fetch::PageCallback<u32>| {},
                    ));
                }
            });
        });
        assert_eq!(
            controller.source_kind().is_some(),
            controller.coordinator().has_source()
        );
    }

    #[test]
    fn test_listener_may_read_source_while_it_changes() {
        let controller = Arc::new(controller(2));
        controller.set_items(vec![1, 2, 3]).unwrap();
        controller.load_first_page();

        let seen: Arc<Mutex<Vec<Option<SourceKind>>>> = Arc::default();
        let (reader, sink) = (Arc::downgrade(&controller), Arc::clone(&seen));
        controller.subscribe(move |event| {
            if let (CacheEvent::Cleared { .. }, Some(c)) = (event, reader.upgrade()) {
                sink.lock().unwrap().push(c.source_kind());
            }
        });

        controller.clear_items();
        assert_eq!(*seen.lock().unwrap(), vec![None]);
        assert!(!controller.coordinator().has_source());
    }

    #[test]
    fn test_dispose_rejects_configuration() {
        let controller = controller(2);
        controller.dispose();
        assert!(controller.is_disposed());
        assert_eq!(controller.set_items(vec![1]), Err(Error::Disposed));
        assert_eq!(controller.set_page_size(5), Err(Error::Disposed));
        assert_eq!(controller.source_kind(), None);
    }
}
