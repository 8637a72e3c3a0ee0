//! Demo error type

use std::path::PathBuf;

/// Errors that stop the demo.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`DemoConfig`](crate::config::DemoConfig).
    #[error("invalid config {path}: {source}")]
    ParseConfig {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// An environment override had an unusable value.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },

    /// Logger setup failed.
    #[error("failed to initialize logger: {0}")]
    Logger(#[from] log::SetLoggerError),

    /// The controller rejected the configuration.
    #[error(transparent)]
    Controller(#[from] combo_cache::Error),

    /// No tokio runtime was available for the async source.
    #[error("no tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}
