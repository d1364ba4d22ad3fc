//! Row parsing errors.

use thiserror::Error;

/// Error raised when a backend row cannot be turned into a typed value.
#[derive(Error, Debug)]
pub enum RowParseError {
    /// The row was not a JSON object (e.g. `null` for an empty old image).
    #[error("Expected a row object, got {0}")]
    NotAnObject(&'static str),

    /// The row object did not match the expected shape.
    #[error("Invalid {entity} row: {source}")]
    Shape {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias using RowParseError.
pub type RowParseResult<T> = Result<T, RowParseError>;
