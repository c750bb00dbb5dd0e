//! Configuration management for the filecache content cache
//!
//! Settings are layered with figment (lowest to highest priority):
//! serialized defaults, a TOML file, then `FILECACHE__*` environment variables.

pub mod logging;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "FILECACHE__";

/// Configuration files probed by [`AppConfig::load`], first match wins
pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["filecache.toml", ".filecache/config.toml"];

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    /// Create a new validation error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Content cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How path casing is treated when building cache keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseFolding {
    /// Keys keep the path's case (case-sensitive filesystems)
    Preserve,
    /// Keys are lowercased (case-insensitive filesystems)
    Fold,
}

impl Default for CaseFolding {
    /// Windows and macOS ship case-insensitive filesystems by default.
    fn default() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            Self::Fold
        } else {
            Self::Preserve
        }
    }
}

/// Content cache configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Key normalization policy for path casing
    #[serde(default)]
    pub case_folding: CaseFolding,
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format for development
    #[default]
    Pretty,
    /// Structured JSON format for production
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration relative to the current working directory
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables (`FILECACHE__*`, `__` separates nested keys)
    /// 2. `filecache.toml` or `.filecache/config.toml`
    /// 3. Default values
    pub fn load() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_in(&cwd)
    }

    /// Load configuration, probing for config files inside `dir`
    pub fn load_in(dir: &Path) -> ConfigResult<Self> {
        let file = CONFIG_FILE_CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|path| path.is_file());

        match file {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading TOML configuration");
                Self::extract(Self::base().merge(Toml::file(&path)))
            }
            None => {
                tracing::debug!(dir = %dir.display(), "No configuration file found, using defaults");
                Self::extract(Self::base())
            }
        }
    }

    /// Load configuration from an explicit TOML file
    ///
    /// Environment variables still take precedence over the file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.is_file() {
            return Err(ConfigError::invalid(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        tracing::info!(path = %path.display(), "Loading TOML configuration");
        Self::extract(Self::base().merge(Toml::file(path)))
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    fn extract(figment: Figment) -> ConfigResult<Self> {
        let config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;

        tracing::debug!(
            case_folding = ?config.cache.case_folding,
            log_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::invalid(format!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}
