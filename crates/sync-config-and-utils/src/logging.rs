//! Logging initialization for ride sync binaries.
//!
//! All binaries share one JSONL stream at `~/.ride-sync/logs/ride-sync.jsonl`,
//! written by the observability package.

use crate::{CoreResult, Paths};
use std::path::PathBuf;

/// Initialize logging for `service_name`.
///
/// This sets up tracing with:
/// - Structured JSONL output to the paths' log file
/// - Log level from RUST_LOG env var or the provided default
/// - Optional compact stderr output for foreground use
///
/// ```ignore
/// init_logging(&paths, "ride-sync", "info", true)?;
/// tracing::info!("watch started");
/// ```
pub fn init_logging(
    paths: &Paths,
    service_name: &str,
    level: &str,
    also_stderr: bool,
) -> CoreResult<Option<PathBuf>> {
    let log_path = observability::init_with_config(observability::LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        file_output: true,
        also_stderr,
    })?;
    Ok(log_path)
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
