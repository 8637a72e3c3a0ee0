//! Demo configuration.
//!
//! Read from an optional JSON file, then overridden by `COMBO_*` environment
//! variables (a `.env` file in the working directory is honoured).

use std::env;
use std::path::Path;
use std::time::Duration;

use combo_cache::ControllerConfig;
use serde::Deserialize;
use simplelog::LevelFilter;

use crate::error::DemoError;

/// Everything the demo can be told.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Settings passed to the controller.
    pub controller: ControllerConfig,
    /// Number of items the simulated backend holds.
    pub item_count: usize,
    /// Simulated per-page latency in milliseconds.
    pub latency_ms: u64,
    /// Log level name (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
    /// Filter typed while the first window is still loading.
    pub second_filter: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            item_count: 500,
            latency_ms: 40,
            log_level: "info".into(),
            second_filter: "7".into(),
        }
    }
}

impl DemoConfig {
    /// Loads the file at `path` (if any) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, DemoError> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| DemoError::ReadConfig {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&text).map_err(|source| DemoError::ParseConfig {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };

        if let Some(value) = env_parse("COMBO_PAGE_SIZE")? {
            config.controller.page_size = value;
        }
        if let Some(value) = env_parse("COMBO_PREFETCH_PAGES")? {
            config.controller.prefetch_pages = value;
        }
        if let Some(value) = env_parse("COMBO_ITEM_COUNT")? {
            config.item_count = value;
        }
        if let Some(value) = env_parse("COMBO_LATENCY_MS")? {
            config.latency_ms = value;
        }
        if let Ok(value) = env::var("COMBO_LOG") {
            config.log_level = value;
        }
        Ok(config)
    }

    /// Simulated latency.
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Parsed log level, `Info` for unknown names.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

fn env_parse<V: std::str::FromStr>(name: &'static str) -> Result<Option<V>, DemoError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| DemoError::InvalidEnv { name, value }),
        Err(_) => Ok(None),
    }
}
