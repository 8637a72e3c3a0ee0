//! Configuration error types

/// Which kind of item source a controller is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A static, fully in-memory item list.
    Items,
    /// An application-supplied paged data source.
    DataSource,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Items => write!(f, "items"),
            Self::DataSource => write!(f, "data source"),
        }
    }
}

/// Errors raised when the controller is misconfigured.
///
/// These are programming errors on the caller's side. The rejected change is
/// never applied, so the previous configuration stays in effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Page size must be at least 1.
    #[error("page size must be an integer > 0, got {requested} (keeping {current})")]
    InvalidPageSize {
        /// The rejected value.
        requested: usize,
        /// The page size that remains in effect.
        current: usize,
    },

    /// Static items and a data source cannot be used together.
    #[error("cannot set {rejected} while {active} is in use")]
    ConflictingSource {
        /// The source kind the caller tried to install.
        rejected: SourceKind,
        /// The source kind that is already installed.
        active: SourceKind,
    },
}

impl ConfigError {
    /// Creates an invalid page size error.
    pub fn invalid_page_size(requested: usize, current: usize) -> Self {
        Self::InvalidPageSize { requested, current }
    }

    /// Creates a conflicting source error.
    pub fn conflicting_source(rejected: SourceKind, active: SourceKind) -> Self {
        Self::ConflictingSource { rejected, active }
    }
}
