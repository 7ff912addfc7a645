//! Configuration file and credential loading.
//!
//! Handles the TOML configuration file and resolution of the API token.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "CLICKUP_API_TOKEN";

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# ClickUp Chat Backup Configuration
# Auto-generated - edit as needed

[api]
# API base URLs
base_url_v2 = "https://api.clickup.com/api/v2"
base_url_v3 = "https://api.clickup.com/api/v3"

# Pause before every request in milliseconds (default: 1000)
request_delay_ms = 1000

# Retries for rate limits, 5xx and connection errors (default: 3)
max_retries = 3

# First retry delay in milliseconds, doubled on each retry (default: 2000)
backoff_base_ms = 2000
max_backoff_ms = 60000

# Request timeout in seconds (default: 30)
timeout_secs = 30

# Page size for channels, messages and replies (default: 100)
page_limit = 100

[backup]
# Directory that receives one folder per run
# (optional, defaults to ~/.clickup-chat-backup/backups)
# output_dir = "/custom/path"

# Fetch thread replies (default: true)
include_replies = true

# Scan for legacy chat views (default: true)
include_legacy = true
"#;

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields the default configuration.
///
/// # Errors
/// Returns error if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = path.map_or_else(AppConfig::default_config_path, Path::to_path_buf);

    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        tracing::debug!(path = %config_path.display(), "No config file, using defaults");
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Create the default configuration file if it doesn't exist.
///
/// Returns the path of the configuration file.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(path: Option<&Path>) -> Result<PathBuf> {
    let config_path = path.map_or_else(AppConfig::default_config_path, Path::to_path_buf);

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %config_path.display(), "Created default configuration");
    }

    Ok(config_path)
}

/// Resolve the API token: explicit flag first, then the environment
/// (which includes anything loaded from `.env`).
///
/// # Errors
/// Returns a configuration error when no non-empty token is found.
pub fn resolve_token(flag: Option<&str>) -> Result<String> {
    let from_env = std::env::var(TOKEN_ENV).ok();
    pick_token(flag, from_env.as_deref())
}

fn pick_token(flag: Option<&str>, env: Option<&str>) -> Result<String> {
    flag.into_iter()
        .chain(env)
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(String::from)
        .ok_or_else(|| AppError::Config {
            message: format!("API token is required. Set it via --token, {TOKEN_ENV} or a .env file"),
        })
}
