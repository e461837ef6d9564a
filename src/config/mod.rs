//! Library configuration.
//!
//! Aggregates configuration for connections into a single `LipcConfig`
//! that can be loaded from YAML files or environment variables.

mod limits;
mod timeout;

pub use limits::{
    ResourceLimits, DEFAULT_INITIAL_STRING_CAPACITY, DEFAULT_MAX_MESSAGE_BYTES,
    DEFAULT_MAX_SERVICE_NAME_LEN,
};
pub use timeout::{TimeoutConfig, DEFAULT_PROP_ACCESS_TIMEOUT_MS, DEFAULT_TIMEOUT_OVERRIDE_FILE};

/// Default configuration file name (without extension).
pub const DEFAULT_CONFIG_FILE: &str = "lipc";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "LIPC_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "LIPC";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "LIPC_LOG";

use serde::Deserialize;

use crate::utils::logging::LogMask;

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Platform log mask, see [`LogMask`].
    pub mask: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            mask: LogMask::DEFAULT.bits(),
        }
    }
}

impl LogConfig {
    /// Mask as a typed value.
    pub fn log_mask(&self) -> LogMask {
        LogMask::from_bits(self.mask)
    }
}

/// Main library configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LipcConfig {
    /// Property access timeout.
    pub timeout: TimeoutConfig,
    /// Message and name limits.
    pub limits: ResourceLimits,
    /// Logging.
    pub log: LogConfig,
}

impl LipcConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `lipc.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Config with an explicit timeout, for tests.
    pub fn for_test() -> Self {
        Self {
            timeout: TimeoutConfig::with_millis(1_000),
            ..Default::default()
        }
    }
}
