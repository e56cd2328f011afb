//! # Configuration Management for poolkit
//!
//! Centralized configuration for the connection validator and the event
//! dispatch loop.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{DispatchConfig, ValidatorConfig};
//!
//! // Probe with `SELECT 1`, valid when a row comes back
//! let validator = ValidatorConfig::new("SELECT 1".to_string(), None);
//!
//! // Probe whose first column must equal 42
//! let strict = ValidatorConfig::new("SELECT 42".to_string(), Some(42));
//!
//! // Bounded dispatch queue of 1024 pending notifications
//! let dispatch = DispatchConfig::new("pool-events".to_string(), 1024);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [validator]
//! probe_query = "SELECT 1"
//! # expected_value = 1
//!
//! [dispatch]
//! thread_name = "poolkit-dispatch"
//! queue_capacity = 0   # 0 = unbounded
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from POOLKIT_CONFIG or ./poolkit.toml
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./poolkit.toml";
const CONFIG_PATH_VAR: &str = "POOLKIT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Connection validator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Probe query issued against the connection under validation
    pub probe_query: String,
    /// When set, the first column of the first row must equal this value;
    /// otherwise any returned row means the connection is valid.
    pub expected_value: Option<i64>,
}

/// Event dispatch loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Name given to the dispatch thread
    pub thread_name: String,
    /// Maximum number of pending notifications, `0` for an unbounded queue
    pub queue_capacity: usize,
}

impl AppConfig {
    /// Load configuration from the TOML file named in `.env` or the default path
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err.into());
            }
        }

        let config = if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            Self::from_file(&config_path)
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        } else {
            Err(ConfigError::Invalid(format!(
                "Config path must be specified in .env file as {} or in {} file",
                CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH
            )))
        }?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validator.probe_query.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Validator probe_query cannot be empty".to_string(),
            ));
        }
        if self.dispatch.thread_name.is_empty() {
            return Err(ConfigError::Invalid(
                "Dispatch thread_name cannot be empty".to_string(),
            ));
        }
        if self.dispatch.thread_name.contains('\0') {
            return Err(ConfigError::Invalid(
                "Dispatch thread_name cannot contain NUL bytes".to_string(),
            ));
        }

        Ok(())
    }
}

impl ValidatorConfig {
    /// Create a new validator configuration
    pub fn new(probe_query: String, expected_value: Option<i64>) -> Self {
        Self {
            probe_query,
            expected_value,
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            probe_query: "SELECT 1".to_string(),
            expected_value: None,
        }
    }
}

impl DispatchConfig {
    /// Create a new dispatch configuration
    pub fn new(thread_name: String, queue_capacity: usize) -> Self {
        Self {
            thread_name,
            queue_capacity,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.queue_capacity > 0
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            thread_name: "poolkit-dispatch".to_string(),
            queue_capacity: 0,
        }
    }
}
