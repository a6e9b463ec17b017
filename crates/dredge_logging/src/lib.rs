//! Shared logging setup for dredge binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "dredge=info";

/// Logging configuration shared by dredge binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr instead of warnings only.
    pub verbose: bool,
    /// Where daily log files go; `None` uses [`logs_dir`]. Set `file_logging`
    /// to false to skip files entirely.
    pub log_dir: Option<PathBuf>,
    pub file_logging: bool,
}

/// Initialize tracing with stderr output and an optional daily log file.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    let mut guard = None;
    let file_layer = if config.file_logging {
        let dir = match config.log_dir {
            Some(dir) => dir,
            None => logs_dir(),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
        let appender =
            tracing_appender::rolling::daily(&dir, format!("{}.log", sanitize_name(config.app_name)));
        let (writer, worker) = tracing_appender::non_blocking(appender);
        guard = Some(worker);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Get the dredge home directory: `$DREDGE_HOME` or `~/.dredge`
pub fn dredge_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("DREDGE_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".dredge")
}

/// Get the logs directory: `<home>/logs`
pub fn logs_dir() -> PathBuf {
    dredge_home().join("logs")
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
