//! Crate-level error type

use super::ConfigError;

/// Errors returned by controller operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The requested configuration change was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The controller was disposed and no longer accepts configuration.
    #[error("controller has been disposed")]
    Disposed,
}

impl Error {
    /// Returns the configuration error, if this is one.
    pub fn as_config(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(e) => Some(e),
            Self::Disposed => None,
        }
    }

    /// Returns `true` if the controller was disposed.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}
