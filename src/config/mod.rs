// src/config/mod.rs
//! Configuration management module
//!
//! Values come from defaults, then `config.toml` if present, then
//! environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the `Trips` tree
    pub base_directory: PathBuf,
}

/// Public IP lookup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub ip_lookup_url: String,
    /// Bounds both the HTTP request and the wait during enrichment
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_directory: default_documents_dir(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ip_lookup_url: "https://ipinfo.io/json".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `config.toml` (if present) and environment variables
    pub fn load() -> Result<Self> {
        Self::load_with(Path::new(DEFAULT_CONFIG_FILE), |key| std::env::var(key).ok())
    }

    /// Load from `path` (if it exists) and override with values from `env`.
    pub fn load_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Config::default()
        };

        config.apply_env(env)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = env("JOURNAL_BASE_DIR") {
            self.storage.base_directory = PathBuf::from(dir);
        }
        if let Some(url) = env("IP_LOOKUP_URL") {
            self.network.ip_lookup_url = url;
        }
        if let Some(secs) = env("IP_LOOKUP_TIMEOUT_SECS") {
            self.network.timeout_secs = secs.parse().context("Invalid IP_LOOKUP_TIMEOUT_SECS")?;
        }
        if let Some(level) = env("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.storage.base_directory.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Storage base directory cannot be empty"));
        }

        if self.network.ip_lookup_url.is_empty() {
            return Err(anyhow::anyhow!("IP lookup URL cannot be empty"));
        }

        if self.network.timeout_secs == 0 {
            return Err(anyhow::anyhow!("IP lookup timeout cannot be 0"));
        }

        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<log::LevelFilter> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => Ok(log::LevelFilter::Trace),
            "debug" => Ok(log::LevelFilter::Debug),
            "info" => Ok(log::LevelFilter::Info),
            "warn" => Ok(log::LevelFilter::Warn),
            "error" => Ok(log::LevelFilter::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", self.logging.level)),
        }
    }

    pub fn ip_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// The user's documents directory, or `$HOME/Documents` when the platform
/// doesn't define one.
pub fn default_documents_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .unwrap_or_else(|| PathBuf::from("./Documents"))
}
