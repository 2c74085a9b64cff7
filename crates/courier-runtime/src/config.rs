//! Layered configuration loading.
//!
//! Configuration is assembled with figment, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`courier.toml` in the working directory, or an explicit
//!    path) — requires the `toml-config` feature (on by default)
//! 3. Environment variables with the `COURIER_` prefix, using `__` to nest:
//!    `COURIER_LOGGING__LEVEL=debug` → `logging.level = "debug"`,
//!    `COURIER_DISPATCHER__MAX_CONCURRENT_UPDATES=16`
//!
//! ```rust,ignore
//! let config = ConfigLoader::new().load()?;
//! let config = ConfigLoader::new().file("config/production.toml").load()?;
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierConfig {
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatcher tuning.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

impl CourierConfig {
    /// Loads configuration from the default sources.
    pub fn load() -> ConfigResult<Self> {
        ConfigLoader::new().load()
    }
}

/// Dispatcher tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Cap on concurrently processed updates. `0` means the engine default;
    /// a negative value removes the cap.
    #[serde(default)]
    pub max_concurrent_updates: i32,

    /// Capacity of each bot's inbound update channel.
    #[serde(default = "default_update_buffer")]
    pub update_buffer: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_updates: 0,
            update_buffer: default_update_buffer(),
        }
    }
}

fn default_update_buffer() -> usize {
    100
}

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The equivalent `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }

    /// Lowercase name, as used in filter directives.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log line formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, abbreviated.
    #[default]
    Compact,
    /// Single-line, with full metadata.
    Full,
    /// Multi-line, human-oriented.
    Pretty,
    /// Newline-delimited JSON. Requires the `json-log` feature.
    Json,
}

/// Log output destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include thread ids in log lines.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line number in log lines.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module level overrides, e.g. `courier_framework = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

/// Figment-based configuration loader.
pub struct ConfigLoader {
    file: Option<PathBuf>,
    with_env: bool,
}

impl ConfigLoader {
    /// Creates a loader using the default sources.
    pub fn new() -> Self {
        Self {
            file: None,
            with_env: true,
        }
    }

    /// Loads a specific TOML file instead of `courier.toml`.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Disables the `COURIER_*` environment layer.
    pub fn without_env(mut self) -> Self {
        self.with_env = false;
        self
    }

    /// Assembles the layers and deserializes the configuration.
    pub fn load(self) -> ConfigResult<CourierConfig> {
        let mut figment = Figment::from(Serialized::defaults(CourierConfig::default()));

        #[cfg(feature = "toml-config")]
        {
            use figment::providers::{Format, Toml};
            let path = self
                .file
                .clone()
                .unwrap_or_else(|| PathBuf::from("courier.toml"));
            figment = figment.merge(Toml::file(path));
        }

        if self.with_env {
            figment = figment.merge(Env::prefixed("COURIER_").split("__"));
        }

        Ok(figment.extract()?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
