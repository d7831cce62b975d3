//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file from the working directory, if present
//! 2. Attempts to load from environment variables
//! 3. If the base URL is not set there, falls back to loading from file
//! 4. Searches multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `LESSONLINK_API_BASE_URL`: Backend base URL (required)
//! - `LESSONLINK_API_TIMEOUT_SECS`: Request timeout in seconds
//! - `LESSONLINK_STORAGE_BACKEND`: `file`, `memory` or `keychain`
//! - `LESSONLINK_STORAGE_PATH`: Credential file path for the `file` backend
//! - `LESSONLINK_LOG_LEVEL`: Default log filter
//! - `LESSONLINK_LOG_JSON`: Emit JSON logs (true/false)
//!
//! Settings without a variable keep their defaults.
//!
//! ## File Locations
//! The loader checks the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./lessonlink.json` or `./lessonlink.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use lessonlink_domain::{Config, LessonLinkError, Result, StorageBackend};

pub const ENV_API_BASE_URL: &str = "LESSONLINK_API_BASE_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "LESSONLINK_API_TIMEOUT_SECS";
pub const ENV_STORAGE_BACKEND: &str = "LESSONLINK_STORAGE_BACKEND";
pub const ENV_STORAGE_PATH: &str = "LESSONLINK_STORAGE_PATH";
pub const ENV_LOG_LEVEL: &str = "LESSONLINK_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "LESSONLINK_LOG_JSON";

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables (after reading `.env`).
/// If the base URL variable is missing, falls back to a config file. Once
/// the base URL is set, an invalid variable is reported rather than
/// silently replaced by file settings.
///
/// # Errors
/// Returns `LessonLinkError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A variable has an invalid value
pub fn load() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Failed to read .env file"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) if optional_env(ENV_API_BASE_URL).is_some() => Err(e),
        Err(e) => {
            tracing::debug!(error = ?e, "Base URL not set in environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `LESSONLINK_API_BASE_URL` must be present; every other variable is
/// optional.
///
/// # Errors
/// Returns `LessonLinkError::Config` if the base URL is missing or a
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.api.base_url = env_var(ENV_API_BASE_URL)?;

    if let Some(timeout) = optional_env(ENV_API_TIMEOUT_SECS) {
        config.api.timeout_secs = timeout.parse::<u64>().map_err(|e| {
            LessonLinkError::Config(format!("Invalid request timeout: {}", e))
        })?;
    }

    if let Some(backend) = optional_env(ENV_STORAGE_BACKEND) {
        config.storage.backend =
            backend.parse::<StorageBackend>().map_err(LessonLinkError::Config)?;
    }

    if let Some(path) = optional_env(ENV_STORAGE_PATH) {
        config.storage.path = path;
    }

    if let Some(level) = optional_env(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }

    config.logging.json = env_bool(ENV_LOG_JSON, config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`find_config_file`].
///
/// # Errors
/// Returns `LessonLinkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(LessonLinkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_file().ok_or_else(|| {
            LessonLinkError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| LessonLinkError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`). Missing
/// sections and fields take their defaults.
///
/// # Errors
/// Returns `LessonLinkError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| LessonLinkError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| LessonLinkError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(LessonLinkError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Search multiple paths for a configuration file
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./lessonlink.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_file() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("lessonlink.json"),
        dir.join("lessonlink.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `LessonLinkError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> Result<String> {
    optional_env(key).ok_or_else(|| {
        LessonLinkError::Config(format!("Missing required environment variable: {}", key))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
///
/// # Returns
/// The parsed boolean value, or `default` if not set.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
