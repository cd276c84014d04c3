//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [api]
//! base_url = "https://shop.example.com/api/v1/"
//! timeout_secs = 30
//!
//! [auth]
//! staleness_threshold_secs = 3300
//!
//! [session]
//! file = "/home/tech/.local/share/forge/session.json"
//! ```
//!
//! Every field is optional so that partial configs (e.g. project-local
//! overrides) can be loaded and merged field by field. Accessors supply the
//! defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1/";
/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default transport retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default delay before the first transport retry, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
/// Default token age that triggers a proactive refresh (55 minutes).
pub const DEFAULT_STALENESS_THRESHOLD_SECS: u64 = 55 * 60;
/// Default margin before JWT expiry that triggers a proactive refresh.
pub const DEFAULT_EXPIRY_BUFFER_SECS: u64 = 5 * 60;

const APP_NAME: &str = "forge";
const SESSION_FILE: &str = "session.json";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
}

impl ForgeConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: ForgeConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: ForgeConfig) {
        self.api.merge(other.api);
        self.auth.merge(other.auth);
        self.session.merge(other.session);
    }

    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                field: "api.base_url".to_string(),
                reason: format!("'{}' is not an http(s) URL", url),
            });
        }
        if self.api.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "api.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Backend connection settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL including the API prefix.
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Transport retries after the first attempt.
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl ApiConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS))
    }

    fn merge(&mut self, other: ApiConfig) {
        merge_field(&mut self.base_url, other.base_url);
        merge_field(&mut self.timeout_secs, other.timeout_secs);
        merge_field(&mut self.max_retries, other.max_retries);
        merge_field(&mut self.retry_backoff_ms, other.retry_backoff_ms);
        merge_field(&mut self.user_agent, other.user_agent);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Token lifecycle settings and authentication endpoint paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Refresh proactively once the access token is this many seconds old.
    pub staleness_threshold_secs: Option<u64>,
    /// Refresh proactively this many seconds before a JWT's `exp`.
    pub expiry_buffer_secs: Option<u64>,
    pub login_path: Option<String>,
    pub refresh_path: Option<String>,
    pub logout_path: Option<String>,
}

impl AuthConfig {
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(
            self.staleness_threshold_secs
                .unwrap_or(DEFAULT_STALENESS_THRESHOLD_SECS),
        )
    }

    pub fn expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.expiry_buffer_secs.unwrap_or(DEFAULT_EXPIRY_BUFFER_SECS))
    }

    fn merge(&mut self, other: AuthConfig) {
        merge_field(
            &mut self.staleness_threshold_secs,
            other.staleness_threshold_secs,
        );
        merge_field(&mut self.expiry_buffer_secs, other.expiry_buffer_secs);
        merge_field(&mut self.login_path, other.login_path);
        merge_field(&mut self.refresh_path, other.refresh_path);
        merge_field(&mut self.logout_path, other.logout_path);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Where the CLI persists its session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub file: Option<PathBuf>,
}

impl SessionConfig {
    /// Configured session file, or `<data dir>/forge/session.json`.
    pub fn file_path(&self) -> Option<PathBuf> {
        self.file
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_NAME).join(SESSION_FILE)))
    }

    fn merge(&mut self, other: SessionConfig) {
        merge_field(&mut self.file, other.file);
    }
}

fn merge_field<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}
