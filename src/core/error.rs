//! Error types for coordination-core operations.

use thiserror::Error;

/// Errors produced by coordination components.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A component rejected its construction arguments.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Argument serialization round-trip failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
