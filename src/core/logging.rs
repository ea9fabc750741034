//! Logging Module
//!
//! Sets up `tracing` for the CLI:
//! - A human-readable stderr logger (stdout carries command output)
//! - An optional JSON file logger with daily rotation
//! - Redirects standard `log` crate events to `tracing`
//! - Configures miette for error reporting

use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// File name prefix of the rolling JSON log.
pub const LOG_FILE_NAME: &str = "nlq-catalog.log";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to install subscriber: {0}")]
    Subscriber(String),
}

/// Build the filter: `RUST_LOG` wins, then the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Initialize the logging system.
///
/// Returns a `WorkerGuard` when the JSON file layer is enabled; it must be
/// kept alive for the duration of the process so buffered logs are flushed.
pub fn init(config: &LoggingConfig, log_dir: &Path) -> Result<Option<WorkerGuard>, LoggingError> {
    let (file_layer, guard) = if config.json_file {
        fs::create_dir_all(log_dir).map_err(|source| LoggingError::LogDir {
            path: log_dir.to_path_buf(),
            source,
        })?;

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_filter(env_filter(config));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .with_filter(env_filter(config));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::Subscriber(e.to_string()))?;

    // Redirect standard `log` macros to `tracing`
    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::debug!("LogTracer already installed: {e}");
    }

    init_miette();

    if config.json_file {
        log::info!(
            "Logging initialized. Writing to: {:?} (daily rolling)",
            log_dir.join(LOG_FILE_NAME)
        );
    }

    Ok(guard)
}

fn init_miette() {
    let interactive = io::stderr().is_terminal();

    miette::set_hook(Box::new(move |_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .color(interactive)
                .build(),
        )
    }))
    .ok(); // Ignore if already set
}
