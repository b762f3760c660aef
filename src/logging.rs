//! Logging setup
//!
//! Installs the global tracing subscriber from [`LoggingConfig`]. A
//! `RUST_LOG` filter in the environment takes precedence over the
//! configured level.

use crate::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to open log file {path}: {error}")]
    File { path: String, error: std::io::Error },

    #[error("Invalid log filter '{0}'")]
    Filter(String),

    #[error("Logging already initialized: {0}")]
    Init(String),
}

/// Build the filter directive for a configured level
fn default_directive(level: &str) -> String {
    format!("flaretrack={level},tower_http={level}")
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = default_directive(&config.level.to_lowercase());
    EnvFilter::try_new(&directive).map_err(|_| LoggingError::Filter(directive))
}

/// Initialize the global subscriber
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;

    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|error| LoggingError::File {
                    path: path.clone(),
                    error,
                })?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let ansi = config.file.is_none();

    let (pretty, json) = if config.format.eq_ignore_ascii_case("json") {
        (None, Some(fmt::layer().json().with_writer(writer)))
    } else {
        (Some(fmt::layer().with_ansi(ansi).with_writer(writer)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}
