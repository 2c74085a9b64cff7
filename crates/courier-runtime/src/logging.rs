//! Logging setup built on `tracing`.
//!
//! The runtime initialises a `tracing-subscriber` registry from
//! [`LoggingConfig`]; applications that want direct control can use
//! [`LoggingBuilder`] instead:
//!
//! ```rust,ignore
//! use courier_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .with_level(tracing::Level::DEBUG)
//!     .directive("courier_framework=trace")
//!     .init();
//! ```
//!
//! A `RUST_LOG` environment variable, when set, takes precedence over the
//! configured base level.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig};

/// Initialises logging from configuration.
///
/// Safe to call more than once; later calls are no-ops if a global
/// subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Builder for the global tracing subscriber.
pub struct LoggingBuilder {
    level: tracing::Level,
    directives: Vec<String>,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    with_thread_ids: bool,
    with_location: bool,
}

impl LoggingBuilder {
    /// Creates a builder with compact stdout output at info level.
    pub fn new() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: Vec::new(),
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            with_thread_ids: false,
            with_location: false,
        }
    }

    /// Creates a builder mirroring a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::new();
        builder.level = config.level.to_tracing_level();
        builder.format = config.format;
        builder.output = config.output;
        builder.file_path.clone_from(&config.file_path);
        builder.with_thread_ids = config.thread_ids;
        builder.with_location = config.file_location;
        for (module, level) in &config.filters {
            builder.directives.push(format!("{module}={}", level.as_str()));
        }
        builder
    }

    /// Sets the base log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Adds a filter directive such as `courier_framework=debug`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Sets the line format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the output destination.
    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Sets the log file path used with [`LogOutput::File`].
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Includes thread ids in log lines.
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    /// Includes source file and line number in log lines.
    pub fn with_location(mut self, enabled: bool) -> Self {
        self.with_location = enabled;
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string().to_lowercase()));
        for directive in &self.directives {
            if let Ok(parsed) = directive.parse() {
                filter = filter.add_directive(parsed);
            }
        }
        filter
    }

    /// Installs the subscriber, panicking on failure.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber, reporting failure instead of panicking.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.build_filter();

        macro_rules! install {
            ($writer:expr) => {
                match self.format {
                    #[cfg(feature = "json-log")]
                    LogFormat::Json => tracing_subscriber::registry()
                        .with(fmt::layer().json().with_writer($writer))
                        .with(filter)
                        .try_init(),
                    #[cfg(not(feature = "json-log"))]
                    LogFormat::Json => tracing_subscriber::registry()
                        .with(
                            fmt::layer()
                                .compact()
                                .with_thread_ids(self.with_thread_ids)
                                .with_file(self.with_location)
                                .with_line_number(self.with_location)
                                .with_writer($writer),
                        )
                        .with(filter)
                        .try_init(),
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(
                            fmt::layer()
                                .compact()
                                .with_thread_ids(self.with_thread_ids)
                                .with_file(self.with_location)
                                .with_line_number(self.with_location)
                                .with_writer($writer),
                        )
                        .with(filter)
                        .try_init(),
                    LogFormat::Full => tracing_subscriber::registry()
                        .with(
                            fmt::layer()
                                .with_thread_ids(self.with_thread_ids)
                                .with_file(self.with_location)
                                .with_line_number(self.with_location)
                                .with_writer($writer),
                        )
                        .with(filter)
                        .try_init(),
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(
                            fmt::layer()
                                .pretty()
                                .with_thread_ids(self.with_thread_ids)
                                .with_file(self.with_location)
                                .with_line_number(self.with_location)
                                .with_writer($writer),
                        )
                        .with(filter)
                        .try_init(),
                }
            };
        }

        match self.output {
            LogOutput::Stdout => install!(std::io::stdout),
            LogOutput::Stderr => install!(std::io::stderr),
            LogOutput::File => {
                let path = self
                    .file_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("courier.log"));
                let appender = tracing_appender::rolling::never(
                    path.parent().unwrap_or_else(|| Path::new(".")),
                    path.file_name().unwrap_or_else(|| OsStr::new("courier.log")),
                );
                install!(appender)
            }
        }
    }
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}
