//! Logging system configuration and initialization
//!
//! This module provides the logging setup for the crawler:
//! - Console output with env-filter based level control
//! - Optional file logging with daily rotation
//! - Module-specific filters to silence chatty dependencies
//!
//! The `RUST_LOG` environment variable overrides everything, e.g.
//! `RUST_LOG="debug,chromiumoxide=warn" scrape-service`.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writer alive for the process lifetime
static LOG_GUARDS: Lazy<Mutex<Vec<non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config);

    let console_layer = if config.console_output {
        Some(fmt::layer().with_target(true))
    } else {
        None
    };

    let file_layer = if config.file_output {
        let log_dir = get_log_directory();
        std::fs::create_dir_all(&log_dir)?;

        let appender = rolling::daily(&log_dir, "commodity-crawler.log");
        let (writer, guard) = non_blocking(appender);
        LOG_GUARDS.lock().unwrap().push(guard);

        Some(fmt::layer().with_ansi(false).with_writer(writer))
    } else {
        None
    };

    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer.map(|l| l.boxed()))
        .try_init()?;

    info!("Logging initialized (level: {})", config.level);
    Ok(())
}

/// Build the env filter from the configured level plus module filters.
/// `RUST_LOG` takes precedence when set.
fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut directives = vec![config.level.clone()];
    for (module, level) in &config.module_filters {
        directives.push(format!("{}={}", module, level));
    }

    EnvFilter::try_new(directives.join(","))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
