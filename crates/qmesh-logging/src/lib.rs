//! Tracing setup for qmesh
//!
//! Stacks console output (pretty or JSONL) and optional file output on a
//! single registry, filtered by `RUST_LOG` or the configured default level.
//!
//! ```ignore
//! use qmesh_logging::{LogConfig, QmeshSubscriberBuilder};
//!
//! // JSONL to stdout
//! QmeshSubscriberBuilder::new().init();
//!
//! // Pretty console output at debug level
//! QmeshSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```
//!
//! When file output is enabled, keep the returned [`WorkerGuard`] alive for
//! as long as logs should be flushed.

pub mod config;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, FilterConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::path::PathBuf;

use thiserror::Error;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::layers::BoxedLayer;

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid filter directive: {0}")]
    InvalidFilter(String),

    #[error("file appender error: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

/// Builder for the qmesh tracing subscriber
#[derive(Debug, Default)]
pub struct QmeshSubscriberBuilder {
    config: LogConfig,
}

impl QmeshSubscriberBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Write JSONL files into `directory`
    pub fn with_file_output(mut self, directory: impl Into<PathBuf>) -> Self {
        let file = self.config.file.get_or_insert_with(FileConfig::default);
        file.directory = directory.into();
        self
    }

    /// Raise or lower the level for one target
    pub fn with_target_level(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.config
            .filters
            .targets
            .insert(target.into(), level.into());
        self
    }

    /// Current configuration
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Build the env filter: `RUST_LOG` if set, else the default level,
    /// plus the configured per-target directives
    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        let base = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.config.default_level)
                .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?,
        };

        self.config
            .filters
            .directives()
            .into_iter()
            .try_fold(base, |filter, directive| {
                let parsed: Directive = directive
                    .parse()
                    .map_err(|e: ParseError| LoggingError::InvalidFilter(format!("{directive}: {e}")))?;
                Ok(filter.add_directive(parsed))
            })
    }

    /// Install the subscriber globally
    ///
    /// Returns the file writer guard when file output is configured.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let filter = self.env_filter()?;

        let mut outputs: Vec<BoxedLayer> = Vec::new();
        if self.config.console.enabled {
            outputs.push(layers::console_layer(&self.config.console, &self.config.jsonl));
        }

        let mut guard = None;
        if let Some(file) = &self.config.file {
            let (writer, worker_guard) = layers::file_writer(file)?;
            outputs.push(layers::jsonl_layer(writer, &self.config.jsonl));
            guard = Some(worker_guard);
        }

        tracing_subscriber::registry()
            .with(outputs)
            .with(filter)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }

    /// Install the subscriber globally, reporting failures on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("qmesh-logging: {e}");
                None
            }
        }
    }
}

/// Initialize logging with default settings (JSONL to stdout)
pub fn init_default() -> Option<WorkerGuard> {
    QmeshSubscriberBuilder::new().init()
}

/// Initialize pretty console logging at debug level
pub fn init_development() -> Option<WorkerGuard> {
    QmeshSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
}

/// Initialize logging for tests; safe to call from every test
pub fn init_testing() {
    let _ = QmeshSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = QmeshSubscriberBuilder::new();
        assert_eq!(builder.config().default_level, "info");
        assert!(builder.config().console.enabled);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = QmeshSubscriberBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config().default_level, "debug");
        assert!(builder.config().console.pretty);
    }

    #[test]
    fn test_with_file_output_keeps_defaults() {
        let builder = QmeshSubscriberBuilder::new().with_file_output("/tmp/qmesh-logs");
        let file = builder.config().file.as_ref().unwrap();
        assert_eq!(file.directory, PathBuf::from("/tmp/qmesh-logs"));
        assert_eq!(file.prefix, "qmesh");
    }

    #[test]
    fn test_invalid_target_level_is_rejected() {
        let builder = QmeshSubscriberBuilder::new().with_target_level("qmesh_network", "loud[");
        assert!(matches!(
            builder.env_filter(),
            Err(LoggingError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_init_testing_is_repeatable() {
        init_testing();
        init_testing();
        tracing::warn!("still fine");
    }
}
