//! Application configuration models.
//!
//! Loaded from `~/.clickup-chat-backup/config.toml`; every field has a
//! default so a partial (or missing) file is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// API access and pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for the v2 API (workspaces, members, legacy views).
    #[serde(default = "default_base_url_v2")]
    pub base_url_v2: String,

    /// Base URL for the v3 API (chat channels and messages).
    #[serde(default = "default_base_url_v3")]
    pub base_url_v3: String,

    /// Pause before every request in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Retries allowed for a transient failure before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds; doubles on every retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size requested from cursor-paginated endpoints.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url_v2: default_base_url_v2(),
            base_url_v3: default_base_url_v3(),
            request_delay_ms: default_request_delay_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_secs: default_timeout_secs(),
            page_limit: default_page_limit(),
        }
    }
}

impl ApiConfig {
    /// Pause before every request.
    #[must_use]
    pub const fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff before retry number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let millis = self
            .backoff_base_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

fn default_base_url_v2() -> String {
    "https://api.clickup.com/api/v2".to_string()
}

fn default_base_url_v3() -> String {
    "https://api.clickup.com/api/v3".to_string()
}

const fn default_request_delay_ms() -> u64 {
    1000
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_backoff_base_ms() -> u64 {
    2000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_page_limit() -> u32 {
    100
}

/// What to back up and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Root directory for run directories (defaults to `<data_dir>/backups`).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Fetch thread replies for messages that have them.
    #[serde(default = "default_true")]
    pub include_replies: bool,

    /// Scan spaces, folders and lists for legacy chat views.
    #[serde(default = "default_true")]
    pub include_legacy: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            include_replies: true,
            include_legacy: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Backup settings.
    #[serde(default)]
    pub backup: BackupConfig,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".clickup-chat-backup")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Root directory that receives one subdirectory per run.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.backup
            .output_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("backups"))
    }
}
