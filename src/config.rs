//! Configuration management for Tasklane
//!
//! This module handles loading, parsing, and validation of configuration files.

use crate::constants::{
    CONFIG_GENERATED, DEFAULT_API_TOKEN_ENV, DEFAULT_BASE_URL, DEFAULT_SYNC_INTERVAL_MINUTES,
    MAX_SYNC_INTERVAL_MINUTES,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Auto-sync interval in minutes (0 = disabled, sync only on login/reconnect)
    pub auto_sync_interval_minutes: u64,
}

/// Remote task service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Backend type (currently only "rest")
    pub backend_type: String,
    /// Base URL of the task service
    pub base_url: String,
    /// Environment variable holding a bearer token used when no session is stored
    pub api_token_env: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connectivity probe interval in seconds
    pub probe_interval_secs: u64,
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; defaults to `<data_dir>/tasklane/tasklane.db`
    pub database_path: Option<PathBuf>,
    /// Keep everything in memory (nothing survives a restart)
    pub in_memory: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging to file
    pub enabled: bool,
    /// Minimum level: "error", "warn", "info", "debug" or "trace"
    pub level: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync_interval_minutes: DEFAULT_SYNC_INTERVAL_MINUTES,
        }
    }
}

impl SyncConfig {
    /// Periodic sync interval, `None` when disabled.
    pub fn interval(&self) -> Option<Duration> {
        match self.auto_sync_interval_minutes {
            0 => None,
            minutes => Some(Duration::from_secs(minutes * 60)),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend_type: "rest".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token_env: DEFAULT_API_TOKEN_ENV.to_string(),
            request_timeout_secs: 30,
            probe_interval_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        self.level
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid logging level '{}'", self.level))
    }
}

impl StorageConfig {
    /// Database file to open, falling back to the XDG data directory.
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::get_data_dir()?.join("tasklane.db")),
        }
    }
}

impl Config {
    /// Load configuration from file or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file()?;

        if let Some(path) = config_path {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in order of precedence
    fn find_config_file() -> Result<Option<PathBuf>> {
        // 1. Check current directory
        let current_dir_config = PathBuf::from("tasklane.toml");
        if current_dir_config.exists() {
            return Ok(Some(current_dir_config));
        }

        // 2. Check XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("tasklane").join("config.toml");
            if xdg_config.exists() {
                return Ok(Some(xdg_config));
            }
        }

        Ok(None)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sync.auto_sync_interval_minutes > MAX_SYNC_INTERVAL_MINUTES {
            anyhow::bail!(
                "auto_sync_interval_minutes cannot exceed {} (24 hours)",
                MAX_SYNC_INTERVAL_MINUTES
            );
        }

        if self.remote.backend_type != "rest" {
            anyhow::bail!("unsupported backend_type '{}'", self.remote.backend_type);
        }
        if !(self.remote.base_url.starts_with("http://") || self.remote.base_url.starts_with("https://")) {
            anyhow::bail!("base_url must start with http:// or https://, got '{}'", self.remote.base_url);
        }
        if self.remote.api_token_env.is_empty() {
            anyhow::bail!("api_token_env cannot be empty");
        }
        if self.remote.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }
        if self.remote.probe_interval_secs == 0 {
            anyhow::bail!("probe_interval_secs must be greater than 0");
        }

        self.logging.level_filter()?;

        Ok(())
    }

    /// Generate default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let toml_content = toml::to_string_pretty(&config).context("Failed to serialize default config")?;

        // Add header comment
        let header = format!(
            "# Tasklane Configuration File\n# Generated on {}\n\n",
            chrono::Local::now().format("%Y-%m-%d")
        );

        let full_content = header + &toml_content;

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(&path, full_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        println!("{}: {}", CONFIG_GENERATED, path.as_ref().display());
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn get_xdg_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
            .map(|dir| dir.join("tasklane"))
    }

    /// Get the XDG data directory path
    pub fn get_data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
            .map(|dir| dir.join("tasklane"))
    }

    /// Get the default config file path
    pub fn get_default_config_path() -> Result<PathBuf> {
        Ok(Self::get_xdg_config_dir()?.join("config.toml"))
    }
}
