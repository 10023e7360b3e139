//! ScreenKeeper Background Session Keeper Library
//!
//! Keeps a user-initiated screen-sharing session alive in the background,
//! with a persistent status indicator and a bounded wake guard, driven
//! through a small command bridge by the controlling UI layer.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod host;
pub mod session;

use anyhow::{Context, Result};
use std::path::Path;

/// Application result type for consistent error handling
pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize tracing subscriber for logging, with a console layer and a
/// plain-text file layer at the configured path
pub fn init_logging(level: &str, log: &config::LogConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let file_path = Path::new(&log.file_path);
    let directory = file_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = file_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "screenkeeper.log".into());

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory: {}", directory.display()))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("screenkeeper={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender),
        )
        .init();

    Ok(())
}
