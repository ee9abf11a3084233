//! Error types for Tradewise.
//!
//! This module defines the unified error enum used across the workspace.
//! Validation and execution feedback for generated SQL is *not* expressed
//! here: those outcomes are structured values owned by `tradewise-sql`.

use thiserror::Error;

/// Unified error type for Tradewise.
///
/// Library functions return `Result<T, AppError>` and never panic.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Trading data store errors
    #[error("Database error: {0}")]
    Database(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Routing and synthesis errors
    #[error("Router error: {0}")]
    Router(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_prefixes() {
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.to_string(), "Database error: pool closed");

        let err = AppError::Other("plain".to_string());
        assert_eq!(err.to_string(), "plain");
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
