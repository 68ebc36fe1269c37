//! File logging for the gateway and hook entry points.
//!
//! Stdout and stderr carry the git protocol and client messages, so nothing
//! is ever logged to the console. Each entry point writes to its own daily
//! file under `<log.root_path>/hooks/`.

use crate::config::Config;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the background writer alive; pending lines are flushed on drop.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Directory the entry points log into.
pub fn log_dir(config: &Config) -> PathBuf {
    config.log.root_path.join("hooks")
}

/// Filter from `RUST_LOG`, falling back to the configured level.
fn filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()))
}

/// Install the global subscriber writing to `<log dir>/<name>.log`.
pub fn init_file_logging(config: &Config, name: &str) -> anyhow::Result<LogGuard> {
    let dir = log_dir(config);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(appender(&dir, name));
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(filter(config));

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(LogGuard { _guard: guard })
}

fn appender(dir: &Path, name: &str) -> tracing_appender::rolling::RollingFileAppender {
    tracing_appender::rolling::daily(dir, format!("{name}.log"))
}
