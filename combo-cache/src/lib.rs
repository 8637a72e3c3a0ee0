//! Lazy paged item cache
//!
//! Backs list-style widgets (combo boxes, autocompletes, virtual lists) whose
//! items come from an application data source one page at a time. The cache
//! fills unloaded rows with placeholders, deduplicates in-flight page
//! requests, and drops results that arrive after the filter or page size
//! changed.
//!
//! The pieces compose bottom-up:
//!
//! - [`cache::PageCache`] stores pages and the total size.
//! - [`fetch::FetchCoordinator`] owns the cache and talks to the data source.
//! - [`index::PageIndexer`] maps flat row indices to pages.
//! - [`DataProviderController`] is what a widget holds.

pub mod cache;
pub mod error;
pub mod event;
pub mod fetch;
pub mod index;

mod controller;
mod slot;

pub use cache::ControllerConfig;
pub use controller::*;
pub use error::Error;
pub use event::CacheEvent;
pub use slot::Slot;
