//! Persistent settings for the evaluation server
//!
//! Loads server defaults (port, bind address, submissions root, entry script
//! path) from a JSON file in the config directory. Command-line flags take
//! precedence over anything read here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::constants::*;

/// Path to the settings file
pub const SETTINGS_FILE: &str = "config/eval_server.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Submissions directory {path} is unreadable: {source}")]
    SubmissionsUnreadable {
        path: String,
        source: std::io::Error,
    },
    #[error("No submissions found in {0}")]
    NoSubmissions(String),
    #[error("Submission {id} not found in {dir}")]
    UnknownSubmission { id: String, dir: String },
}

/// Server defaults that survive between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub bind: String,
    pub submissions_dir: String,
    /// Request path of the entry script that receives the bundle
    pub entry_path: String,
    /// Optional bundle template overriding the built-in one
    pub bundle_template: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND_ADDR.to_string(),
            submissions_dir: DEFAULT_SUBMISSIONS_DIR.to_string(),
            entry_path: DEFAULT_ENTRY_PATH.to_string(),
            bundle_template: None,
        }
    }
}

impl ServerSettings {
    /// Load settings from the default path, or return defaults
    pub fn load() -> Self {
        Self::load_from(SETTINGS_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No {} found, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Directory of the submission to serve. An explicit id must exist;
/// otherwise the lexicographically greatest entry wins.
pub fn resolve_submission(dir: impl AsRef<Path>, id: Option<&str>) -> Result<PathBuf, SettingsError> {
    let dir = dir.as_ref();
    if let Some(id) = id {
        let path = dir.join(id);
        if path.is_dir() {
            return Ok(path);
        }
        return Err(SettingsError::UnknownSubmission {
            id: id.to_string(),
            dir: dir.display().to_string(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|source| SettingsError::SubmissionsUnreadable {
        path: dir.display().to_string(),
        source,
    })?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name != SUBMISSIONS_PLACEHOLDER)
        .collect();
    names.sort();

    match names.pop() {
        Some(latest) => Ok(dir.join(latest)),
        None => Err(SettingsError::NoSubmissions(dir.display().to_string())),
    }
}
