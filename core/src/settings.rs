//! Preference map and settings persistence

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// User-adjustable key/value preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences {
    values: HashMap<String, Value>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_preference(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Insert a preference, overwriting any previous value for `key`
    pub fn set_preference(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove_preference(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    preferences: Preferences,
}

/// Settings file location relative to the user config directory
const DEFAULT_SETTINGS_PATH: &str = "plaud-claude/settings.json";

/// Expand ~ to home directory
pub(crate) fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Get the default settings file path
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join(DEFAULT_SETTINGS_PATH))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
}

/// Typed settings plus free-form preferences, bound to a file on disk
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    pub settings: Settings,
    pub preferences: Preferences,
}

impl SettingsStore {
    /// Empty store bound to `path`; nothing is read
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SettingsStore {
            path: path.into(),
            settings: Settings::default(),
            preferences: Preferences::new(),
        }
    }

    /// Load settings from a file
    ///
    /// If `path` is None, uses the default path under the user config
    /// directory. A missing file yields defaults.
    pub fn load(path: Option<&str>) -> Result<Self, SettingsError> {
        let path = match path {
            Some(p) => expand_path(p),
            None => default_settings_path(),
        };

        if !path.exists() {
            debug!(path = %path.display(), "settings file not found, using defaults");
            return Ok(Self::new(path));
        }

        let contents = fs::read_to_string(&path)?;
        let file: SettingsFile = serde_json::from_str(&contents)?;
        info!(path = %path.display(), preferences = file.preferences.len(), "loaded settings");

        Ok(SettingsStore {
            path,
            settings: file.settings,
            preferences: file.preferences,
        })
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = SettingsFile {
            settings: self.settings.clone(),
            preferences: self.preferences.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
