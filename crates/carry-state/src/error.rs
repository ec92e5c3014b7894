//! Error types for carry-state.

use thiserror::Error;

/// Persistence error types.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for persistence operations.
pub type StateResult<T> = Result<T, StateError>;
