//! Realtime channel error types.

use thiserror::Error;

/// Realtime error type.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Not connected error
    #[error("Not connected to realtime")]
    NotConnected,

    /// The handle does not belong to a registered channel
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// A channel with the same topic is already registered
    #[error("Channel already subscribed: {0}")]
    DuplicateChannel(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Unexpected frame shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Send error
    #[error("Failed to send message: {0}")]
    Send(String),
}

/// Result type alias using RealtimeError.
pub type RealtimeResult<T> = Result<T, RealtimeError>;
