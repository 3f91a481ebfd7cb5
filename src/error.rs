//! Tracker error types.

use thiserror::Error;

/// Errors surfaced to callers of the tracker stores.
///
/// Missing records are never an error (stores auto-initialize), and storage
/// faults are reported through store events rather than returned.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Input rejected before any state was touched.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backing store could not be written.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// A stored snapshot could not be decoded.
    #[error("Deserialization failure: {0}")]
    Deserialization(String),
}

impl TrackerError {
    /// Shorthand for building a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation(message.into())
    }
}

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
