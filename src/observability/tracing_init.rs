//! Tracing initialization with configurable logging formats.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LogLevel, LoggingConfig};

/// Initialize the global tracing subscriber.
///
/// `debug` raises the configured level to `debug` (the `--debug` flag).
/// `RUST_LOG`, when set, replaces the configured filter entirely.
pub fn init_tracing(config: &LoggingConfig, debug: bool) -> Result<(), TracingError> {
    let filter = build_env_filter(config, debug);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match (&config.format, config.timestamps) {
        (LogFormat::Pretty, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line),
            )
            .try_init(),
        (LogFormat::Pretty, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Compact, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line),
            )
            .try_init(),
        (LogFormat::Compact, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Json, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line),
            )
            .try_init(),
        (LogFormat::Json, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line)
                    .without_time(),
            )
            .try_init(),
    };

    result.map_err(|e| TracingError::Init(e.to_string()))
}

/// Build the environment filter from logging config.
fn build_env_filter(config: &LoggingConfig, debug: bool) -> EnvFilter {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directives = filter_directives(config, debug, rust_log.as_deref());
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(base_level(config, debug)))
}

fn base_level(config: &LoggingConfig, debug: bool) -> String {
    let mut level = config.level.to_tracing_level();
    // More verbose levels compare greater
    if debug {
        level = level.max(tracing::Level::DEBUG);
    }
    level.as_str().to_ascii_lowercase()
}

fn filter_directives(config: &LoggingConfig, debug: bool, rust_log: Option<&str>) -> String {
    let base_level = base_level(config, debug);

    if let Some(rust_log) = rust_log {
        rust_log.to_string()
    } else if let Some(filter) = &config.filter {
        format!("{},{}", base_level, filter)
    } else {
        // sqlx logs every statement at info
        format!("{},sqlx=warn", base_level)
    }
}

/// Tracing initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Failed to initialize tracing: {0}")]
    Init(String),
}
