//! Sync session error types.
//!
//! These never cross the session boundary; they exist so internal steps can
//! use `?` and the dispatcher can log one typed failure.

use thiserror::Error;

/// Sync error type.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The channel provider refused a request
    #[error("Channel provider error: {0}")]
    Channel(#[from] realtime_channel::RealtimeError),

    /// A row image could not be parsed
    #[error("Malformed row: {0}")]
    Row(#[from] ride_types::RowParseError),

    /// A change arrived on a channel that does not listen for it
    #[error("Unexpected {kind} change on {channel} channel")]
    UnexpectedChange {
        kind: &'static str,
        channel: &'static str,
    },
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;
