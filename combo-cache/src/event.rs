//! Cache change notifications.
//!
//! The controller does not re-render anything. It tells subscribers what
//! happened and lets them decide.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::fetch::Generation;

/// Something observable happened to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fetch was just issued to the data source.
    PageRequested {
        /// The requested page.
        page_index: usize,
        /// Generation the request belongs to.
        generation: Generation,
    },
    /// A page arrived and was stored.
    PageLoaded {
        /// The stored page.
        page_index: usize,
        /// Total size reported with the page.
        size: usize,
        /// `true` if this is the first page stored since the last clear.
        first_since_clear: bool,
    },
    /// The known total size changed.
    SizeChanged {
        /// The new size.
        size: Option<usize>,
    },
    /// The cache was emptied and a new generation started.
    Cleared {
        /// The generation now in effect.
        generation: Generation,
    },
    /// The coordinator switched between idle and fetching.
    LoadingChanged(bool),
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "__listener_{}", self.0)
    }
}

/// Callback invoked for every [`CacheEvent`].
pub type Listener = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Registered listeners.
#[derive(Default)]
pub(crate) struct Listeners {
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId::new();
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Clones the listener list so events can be dispatched without a lock.
    pub(crate) fn snapshot(&self) -> Vec<Listener> {
        self.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}
