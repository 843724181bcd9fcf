//! Configuration module for Cabinet.

use serde::Deserialize;
use std::path::Path;

use crate::{CabinetError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/cabinet.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding file payloads.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Maximum payload size in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
}

fn default_storage_path() -> String {
    "data/blobs".to_string()
}

fn default_max_file_size() -> u64 {
    100
}

impl StorageConfig {
    /// Maximum payload size in bytes. Saturates instead of overflowing.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            max_file_size_mb: default_max_file_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/cabinet.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Where permission and group membership answers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RbacMode {
    /// Read the local `user_permissions` / `user_groups` tables.
    #[default]
    Local,
    /// Ask the external auth service over HTTP.
    Remote,
}

/// RBAC collaborator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RbacConfig {
    /// Source of permission answers.
    #[serde(default)]
    pub mode: RbacMode,
    /// Base URL of the auth service (remote mode only).
    #[serde(default)]
    pub base_url: String,
    /// Bearer token presented to the auth service.
    #[serde(default)]
    pub auth_token: String,
    /// Lifetime of a cached answer in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Upper bound for a single re-fetch in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_fetch_timeout() -> u64 {
    5
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            mode: RbacMode::default(),
            base_url: String::new(),
            auth_token: String::new(),
            cache_ttl_secs: default_cache_ttl(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// Admin aggregator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Number of users reported in the storage leaderboard.
    #[serde(default = "default_top_users")]
    pub top_users_limit: usize,
    /// Number of extensions reported in the type histogram.
    #[serde(default = "default_top_extensions")]
    pub top_extensions_limit: usize,
    /// Permission that grants cross-tenant read access.
    #[serde(default = "default_admin_capability")]
    pub capability: String,
}

fn default_top_users() -> usize {
    5
}

fn default_top_extensions() -> usize {
    10
}

fn default_admin_capability() -> String {
    "manage_files".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            top_users_limit: default_top_users(),
            top_extensions_limit: default_top_extensions(),
            capability: default_admin_capability(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// RBAC collaborator configuration.
    #[serde(default)]
    pub rbac: RbacConfig,
    /// Admin aggregator configuration.
    #[serde(default)]
    pub admin: AdminConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(CabinetError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CabinetError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CABINET_RBAC_TOKEN`: Override the auth service bearer token
    /// - `CABINET_RBAC_URL`: Override the auth service base URL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("CABINET_RBAC_TOKEN") {
            if !token.is_empty() {
                self.rbac.auth_token = token;
            }
        }
        if let Ok(url) = std::env::var("CABINET_RBAC_URL") {
            if !url.is_empty() {
                self.rbac.base_url = url;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - Remote RBAC mode is selected without a base URL
    /// - The cache TTL or fetch timeout is zero
    /// - An admin limit is zero
    /// - `storage.max_file_size_mb` is zero or does not fit in bytes
    pub fn validate(&self) -> Result<()> {
        if self.storage.max_file_size_mb == 0
            || self.storage.max_file_size_mb.checked_mul(1024 * 1024).is_none()
        {
            return Err(CabinetError::Config(format!(
                "storage.max_file_size_mb must be between 1 and {}",
                u64::MAX / (1024 * 1024)
            )));
        }
        if self.rbac.mode == RbacMode::Remote && self.rbac.base_url.is_empty() {
            return Err(CabinetError::Config(
                "rbac.mode is \"remote\" but rbac.base_url is not set. \
                 Set it in the config file or via CABINET_RBAC_URL."
                    .to_string(),
            ));
        }
        if self.rbac.cache_ttl_secs == 0 || self.rbac.fetch_timeout_secs == 0 {
            return Err(CabinetError::Config(
                "rbac.cache_ttl_secs and rbac.fetch_timeout_secs must be positive".to_string(),
            ));
        }
        if self.admin.top_users_limit == 0 || self.admin.top_extensions_limit == 0 {
            return Err(CabinetError::Config(
                "admin limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
