//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CSRF_COOKIE, DEFAULT_CSRF_HEADER, DEFAULT_LOGIN_REDIRECT_PATH, DEFAULT_PROFILE_PATH,
    DEFAULT_REFRESH_PATH, DEFAULT_REGISTER_PATH, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_STORAGE_NAMESPACE, DEFAULT_TOKEN_PATH,
};
use crate::impl_wire_name_conversions;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is appended to (e.g. `https://learn.example.com/api`)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout, shared by the session refresher
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_register_path")]
    pub register_path: String,
    #[serde(default = "default_profile_path")]
    pub profile_path: String,
    /// Optional server-side logout (token revocation) endpoint
    #[serde(default)]
    pub logout_path: Option<String>,
    /// Where the UI should navigate once the session is gone
    #[serde(default = "default_login_redirect_path")]
    pub login_redirect_path: String,
    #[serde(default = "default_csrf_cookie_name")]
    pub csrf_cookie_name: String,
    #[serde(default = "default_csrf_header_name")]
    pub csrf_header_name: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token_path: default_token_path(),
            refresh_path: default_refresh_path(),
            register_path: default_register_path(),
            profile_path: default_profile_path(),
            logout_path: None,
            login_redirect_path: default_login_redirect_path(),
            csrf_cookie_name: default_csrf_cookie_name(),
            csrf_header_name: default_csrf_header_name(),
            user_agent: None,
        }
    }
}

/// Which key-value store holds the persisted credentials
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file on disk
    #[default]
    File,
    /// Process memory only; nothing survives a restart
    Memory,
    /// Platform keychain (requires the `keychain` feature of the infra crate)
    Keychain,
}

impl_wire_name_conversions!(StorageBackend {
    File => "file",
    Memory => "memory",
    Keychain => "keychain",
});

/// Credential persistence configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// File path for the `file` backend
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Key prefix separating credentials from unrelated preferences
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            namespace: default_namespace(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_register_path() -> String {
    DEFAULT_REGISTER_PATH.to_string()
}

fn default_profile_path() -> String {
    DEFAULT_PROFILE_PATH.to_string()
}

fn default_login_redirect_path() -> String {
    DEFAULT_LOGIN_REDIRECT_PATH.to_string()
}

fn default_csrf_cookie_name() -> String {
    DEFAULT_CSRF_COOKIE.to_string()
}

fn default_csrf_header_name() -> String {
    DEFAULT_CSRF_HEADER.to_string()
}

fn default_storage_path() -> String {
    "lessonlink-credentials.json".to_string()
}

fn default_namespace() -> String {
    DEFAULT_STORAGE_NAMESPACE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.api.refresh_path, "/auth/token/refresh/");
        assert_eq!(config.api.logout_path, None);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.namespace, "lessonlink.auth");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api": {"base_url": "https://learn.example.com/api"}}"#)
                .unwrap();
        assert_eq!(config.api.base_url, "https://learn.example.com/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.csrf_header_name, "X-CSRFToken");
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("Keychain".parse::<StorageBackend>().unwrap(), StorageBackend::Keychain);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
