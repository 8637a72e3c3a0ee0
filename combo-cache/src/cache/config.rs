//! Controller configuration

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Configuration for a [`DataProviderController`](crate::DataProviderController).
///
/// # Example
///
/// ```
/// use combo_cache::cache::ControllerConfig;
///
/// let config = ControllerConfig::default()
///     .with_page_size(100)
///     .with_prefetch_pages(1);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Number of items requested per fetch.
    ///
    /// Default: 50
    pub page_size: usize,

    /// Extra pages to load after the page containing a requested row.
    ///
    /// Default: 0
    pub prefetch_pages: usize,

    /// Filter applied to the first fetch.
    ///
    /// Default: empty
    pub filter: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_pages: 0,
            filter: String::new(),
        }
    }
}

impl ControllerConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the number of pages to prefetch.
    pub fn with_prefetch_pages(mut self, pages: usize) -> Self {
        self.prefetch_pages = pages;
        self
    }

    /// Sets the initial filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::invalid_page_size(0, DEFAULT_PAGE_SIZE));
        }
        Ok(())
    }
}
