//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] carry_telemetry::TelemetryError),

    #[error("Executor error: {0}")]
    Executor(#[from] carry_executor::ExecutorError),

    #[error("Persistence error: {0}")]
    State(#[from] carry_state::StateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
