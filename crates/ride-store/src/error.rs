//! Error types for Ride Store operations.

use thiserror::Error;

/// Ride Store error type.
#[derive(Debug, Error)]
pub enum RideStoreError {
    /// Network or transport-level HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Supabase returned a non-success HTTP status.
    ///
    /// Common causes: expired access token, RLS policy violation.
    #[error("Supabase error: {status} - {message}")]
    Supabase {
        /// The HTTP status code returned by Supabase.
        status: u16,
        /// The response body.
        message: String,
    },

    /// A lifecycle procedure ran but reported failure.
    #[error("Procedure {name} failed: {message}")]
    Procedure { name: String, message: String },

    /// The requested row does not exist or is not visible to the user.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A returned row did not have the expected shape.
    #[error("Row error: {0}")]
    Row(#[from] ride_types::RowParseError),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using RideStoreError.
pub type RideStoreResult<T> = Result<T, RideStoreError>;
