//! Logging setup shared across binaries.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{Level, warn};
use tracing_subscriber::EnvFilter;

pub const DEBUG_LOG_SETTINGS_FILE: &str = "config/debug_logging.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugLogConfig {
    pub enabled: bool,
    /// Why the settings file was not used. Reported again by `init`, since
    /// loading happens before any subscriber exists.
    #[serde(skip)]
    pub load_error: Option<String>,
}

impl DebugLogConfig {
    pub fn load() -> Self {
        Self::load_from(DEBUG_LOG_SETTINGS_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        let loaded = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
            .and_then(|content| {
                serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
            });
        match loaded {
            Ok(config) => config,
            Err(err) => {
                warn!("{}, using defaults", err);
                Self {
                    load_error: Some(err),
                    ..Self::default()
                }
            }
        }
    }

    /// Config file, raised to debug when `--debug-log` was passed
    pub fn load_with_flag(debug_flag: bool) -> Self {
        let mut config = Self::load();
        if debug_flag {
            config.enabled = true;
        }
        config
    }

    pub fn level(&self) -> Level {
        if self.enabled { Level::DEBUG } else { Level::INFO }
    }
}

/// Install the global subscriber. `RUST_LOG` directives still apply on top
/// of the base level.
pub fn init(config: &DebugLogConfig) {
    let filter = EnvFilter::from_default_env().add_directive(config.level().into());
    // A second init (tests, embedded use) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    if let Some(err) = &config.load_error {
        warn!("{}, using defaults", err);
    }
}
