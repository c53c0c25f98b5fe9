//! Logging and tracing initialization.
//!
//! The worker runs unattended, so every failure path must land in the log
//! stream; there is no interactive surface. Errors during subscriber
//! installation are ignored (tests install their own).

use std::fs::OpenOptions;
use std::sync::Mutex;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match (&config.file, config.json) {
        (Some(path), json) => {
            let file = match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("cutforge: cannot open log file {}: {e}", path.display());
                    return init_logging(&LoggingConfig {
                        file: None,
                        ..config.clone()
                    });
                }
            };
            let writer = Mutex::new(file);
            if json {
                let subscriber = builder.json().with_writer(writer).finish();
                tracing::subscriber::set_global_default(subscriber).ok();
            } else {
                let subscriber = builder.with_ansi(false).with_writer(writer).finish();
                tracing::subscriber::set_global_default(subscriber).ok();
            }
        }
        (None, true) => {
            let subscriber = builder.json().finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (None, false) => {
            let subscriber = builder.finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
