//! # Observability
//!
//! Centralized tracing setup for ride sync services.
//!
//! Services call `observability::init()` once at startup and use standard
//! `tracing` macros everywhere else. Libraries never install subscribers.
//!
//! Events are written as JSONL to a central file (by default
//! `~/.ride-sync/logs/ride-sync.jsonl`) so they can be followed with
//! `tail -f … | jq`. A compact stderr layer can be added for foreground use.
//!
//! ## Usage
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "ride-sync".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! })?;
//! tracing::info!("service started");
//! ```

mod json_layer;
mod writer;

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use json_layer::{JsonLayer, LogEntry};
pub use writer::LogFileWriter;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// No log path was given and the home directory is unknown
    #[error("Could not determine home directory for the log file")]
    NoHomeDir,

    /// The log file could not be opened
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A global subscriber is already installed
    #[error("Tracing already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every log line.
    pub service_name: String,

    /// Default filter (e.g. "debug", "info,ride_sync=trace").
    /// `RUST_LOG` wins when set.
    pub default_level: String,

    /// JSONL file path. Defaults to `~/.ride-sync/logs/ride-sync.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Write the JSONL file at all.
    pub file_output: bool,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            file_output: true,
            also_stderr: false,
        }
    }
}

impl LogConfig {
    /// Resolve the JSONL file location.
    pub fn resolved_log_path(&self) -> Result<PathBuf, ObservabilityError> {
        match &self.log_path {
            Some(path) => Ok(path.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".ride-sync").join("logs").join("ride-sync.jsonl"))
                .ok_or(ObservabilityError::NoHomeDir),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }
}

/// Initialize with default settings for `service_name`.
pub fn init(service_name: &str) -> Result<Option<PathBuf>, ObservabilityError> {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    })
}

/// Install the global subscriber.
///
/// Returns the JSONL path when file output is enabled.
pub fn init_with_config(config: LogConfig) -> Result<Option<PathBuf>, ObservabilityError> {
    let (file_layer, log_path) = if config.file_output {
        let path = config.resolved_log_path()?;
        let writer = LogFileWriter::open(&path).map_err(|source| ObservabilityError::LogFile {
            path: path.clone(),
            source,
        })?;
        let layer = JsonLayer::new(config.service_name.clone(), writer)
            .with_filter(config.env_filter());
        (Some(layer), Some(path))
    } else {
        (None, None)
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(config.env_filter())
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        log_path = ?log_path,
        "observability initialized"
    );
    Ok(log_path)
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
