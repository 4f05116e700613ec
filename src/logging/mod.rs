
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Name of the log file for a run started at `started`
#[inline]
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("scrape_log_{}.txt", started.format("%Y_%m_%d_%H_%M_%S"))
}

/// `RUST_LOG` when set, otherwise the configured level
#[inline]
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// A single, never-rotated log file inside `log_dir`
#[inline]
pub fn file_appender(log_dir: &Path, file_name: &str) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in {}", log_dir.display()))
}

/// Install the global subscriber: a per-run file in `log_dir`, plus stderr when enabled.
///
/// The returned guard flushes the file writer on drop and must live until exit.
#[inline]
pub fn init(config: &LoggingConfig, log_dir: &Path) -> Result<WorkerGuard> {
    let appender = file_appender(log_dir, &log_file_name(Local::now()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let console_layer = config
        .console
        .then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
