//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const PLUGIN_VERSION: &str = "1.0.0";

/// Default configuration values
pub const DEFAULT_CLAUDE_BASE_URL: &str = "https://api.claude.example.com";
pub const DEFAULT_PLAUD_BASE_URL: &str = "https://api.plaud.example.com";
pub const DEFAULT_VAULT_BASE_URL: &str = "http://127.0.0.1:27123";
const DEFAULT_THEME: &str = "light";
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INBOX_SETTLE_SECS: u64 = 5;

/// Plugin settings
///
/// Every field has a default, so a settings file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: String,
    pub language: String,
    pub notifications_enabled: bool,
    pub claude_base_url: String,
    pub plaud_base_url: String,
    pub vault_base_url: String,
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plaud_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_api_key: Option<String>,
    /// Directory watched for new audio recordings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbox_dir: Option<PathBuf>,
    /// Seconds a recording must go unmodified before it is picked up
    pub inbox_settle_secs: u64,
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn inbox_settle(&self) -> Duration {
        Duration::from_secs(self.inbox_settle_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: DEFAULT_THEME.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            notifications_enabled: true,
            claude_base_url: DEFAULT_CLAUDE_BASE_URL.to_string(),
            plaud_base_url: DEFAULT_PLAUD_BASE_URL.to_string(),
            vault_base_url: DEFAULT_VAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            claude_api_key: None,
            plaud_api_key: None,
            vault_api_key: None,
            inbox_dir: None,
            inbox_settle_secs: DEFAULT_INBOX_SETTLE_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"theme": "dark", "request_timeout_secs": 5}"#).unwrap();
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.language, "en");
        assert!(settings.notifications_enabled);
        assert_eq!(settings.claude_base_url, DEFAULT_CLAUDE_BASE_URL);
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
        assert_eq!(settings.inbox_settle(), Duration::from_secs(5));
    }

    #[test]
    fn test_unset_keys_are_not_serialized() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(!json.contains("api_key"));
        assert!(!json.contains("inbox_dir"));
    }
}
