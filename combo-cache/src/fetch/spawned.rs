//! Adapter for async data sources running on tokio.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::runtime::TryCurrentError;

use super::DataSource;
use super::FetchRequest;
use super::PageCallback;

/// One page of results from an [`AsyncDataSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage<T> {
    /// Items on the page, at most `page_size` of them.
    pub items: Vec<T>,
    /// Total number of items matching the request's filter.
    pub total_size: usize,
}

impl<T> FetchedPage<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, total_size: usize) -> Self {
        Self { items, total_size }
    }
}

/// A data source written as an async function.
///
/// Wrap it in [`SpawnedSource`] to use it with a coordinator.
///
/// # Example
///
/// ```ignore
/// struct Remote { client: reqwest::Client }
///
/// #[async_trait]
/// impl AsyncDataSource<String> for Remote {
///     async fn fetch_page(&self, request: FetchRequest) -> FetchedPage<String> {
///         let body = self.client.post(URL).json(&request).send().await...;
///         FetchedPage::new(body.items, body.total)
///     }
/// }
///
/// controller.set_data_source(Arc::new(SpawnedSource::from_current(Remote { client })?))?;
/// ```
#[async_trait]
pub trait AsyncDataSource<T>: Send + Sync + 'static {
    /// Produces one page.
    async fn fetch_page(&self, request: FetchRequest) -> FetchedPage<T>;
}

/// Runs each fetch of an [`AsyncDataSource`] as a task on a tokio runtime.
///
/// Tasks are never aborted. When the cache moves on to a new generation the
/// task still runs to completion and its result is discarded.
pub struct SpawnedSource<S> {
    source: Arc<S>,
    handle: Handle,
}

impl<S> SpawnedSource<S> {
    /// Creates an adapter spawning onto `handle`.
    pub fn new(source: S, handle: Handle) -> Self {
        Self {
            source: Arc::new(source),
            handle,
        }
    }

    /// Creates an adapter spawning onto the runtime of the calling context.
    pub fn from_current(source: S) -> Result<Self, TryCurrentError> {
        Ok(Self::new(source, Handle::try_current()?))
    }

    /// Returns the wrapped source.
    pub fn inner(&self) -> &S {
        &self.source
    }
}

impl<T, S> DataSource<T> for SpawnedSource<S>
where
    T: Send + 'static,
    S: AsyncDataSource<T>,
{
    fn fetch(&self, request: FetchRequest, callback: PageCallback<T>) {
        let source = Arc::clone(&self.source);
        self.handle.spawn(async move {
            let page = source.fetch_page(request).await;
            callback.resolve(page.items, page.total_size);
        });
    }
}

impl<S> std::fmt::Debug for SpawnedSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedSource").finish_non_exhaustive()
    }
}
