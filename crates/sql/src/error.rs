//! Failure taxonomy for statement validation and execution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tradewise_core::AppError;

/// Structured failure kinds fed back to the statement generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    SecurityViolation,
    IntentViolation,
    SyntaxError,
    ExecutionError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SecurityViolation => "SECURITY_VIOLATION",
            ErrorKind::IntentViolation => "INTENT_VIOLATION",
            ErrorKind::SyntaxError => "SYNTAX_ERROR",
            ErrorKind::ExecutionError => "EXECUTION_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Statement exceeded the {0:?} timeout")]
    Timeout(Duration),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("{0}")]
    Query(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Database(err.to_string())
    }
}
