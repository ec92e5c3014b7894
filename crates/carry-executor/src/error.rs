//! Error types for carry-executor.

use thiserror::Error;

/// Executor error types.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] carry_exchange::ExchangeError),

    #[error("Persistence error: {0}")]
    State(#[from] carry_state::StateError),

    #[error("Model error: {0}")]
    Core(#[from] carry_core::CoreError),
}

/// Result type alias for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
