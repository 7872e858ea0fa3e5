//! Configuration management for toolrelay
//!
//! TOML-based configuration with defaults and validation.
//! Location: ~/.toolrelay/config.toml

use crate::errors::{Result, ToolError};
use crate::tools::breaker::BreakerConfig;
use crate::tools::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for toolrelay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub execution: ExecutionConfig,
    pub breaker: BreakerSettings,
    pub logging: LoggingConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub check_timeout_ms: u64,
    pub user_agent: Option<String>,
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

/// Execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub attempt_timeout_ms: u64,

    /// 0 = unbounded
    pub max_parallel: usize,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub window_size: usize,
    pub failure_ratio: f64,
    pub open_duration_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            check_timeout_ms: 5000,
            user_agent: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: crate::tools::retry::MAX_RETRIES,
            base_delay_ms: crate::tools::retry::BASE_DELAY_MS,
            max_jitter_ms: crate::tools::retry::MAX_JITTER_MS,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 10_000,
            max_parallel: 0,
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            window_size: 10,
            failure_ratio: 0.5,
            open_duration_ms: 30_000,
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

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ToolError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate TOML
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| ToolError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(config_path) if config_path.exists() => Self::load_from_file(&config_path),
            _ => Ok(Config::default()),
        }
    }

    /// Standard config location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".toolrelay").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.http.connect_timeout_ms == 0 || self.http.check_timeout_ms == 0 {
            return Err(ToolError::Config(
                "http timeouts must be greater than 0".to_string(),
            ));
        }

        if self.execution.attempt_timeout_ms == 0 {
            return Err(ToolError::Config(
                "attempt_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.breaker.window_size == 0 {
            return Err(ToolError::Config(
                "window_size must be greater than 0".to_string(),
            ));
        }

        if !(self.breaker.failure_ratio > 0.0 && self.breaker.failure_ratio <= 1.0) {
            return Err(ToolError::Config(
                "failure_ratio must be in (0.0, 1.0]".to_string(),
            ));
        }

        if self.breaker.open_duration_ms == 0 {
            return Err(ToolError::Config(
                "open_duration_ms must be greater than 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ToolError::Config(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ToolError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ToolError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Retry policy described by `[retry]`
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_config(self.retry.max_retries, self.retry.base_delay_ms)
            .with_jitter(self.retry.max_jitter_ms)
    }

    /// Breaker thresholds described by `[breaker]`
    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            window_size: self.breaker.window_size,
            failure_ratio: self.breaker.failure_ratio,
            open_duration: Duration::from_millis(self.breaker.open_duration_ms),
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.execution.attempt_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.http.connect_timeout_ms)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.http.check_timeout_ms)
    }
}
