//! Responder and router failures.

use crate::router::Responder;
use serde::{Deserialize, Serialize};
use std::fmt;
use tradewise_core::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// A whole responder branch failed, retries included
    ResponderFailure,

    /// Synthesis or coordination failed
    RouterFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ResponderFailure => "RESPONDER_FAILURE",
            ErrorKind::RouterFailure => "ROUTER_FAILURE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lift a synthesis or coordination failure into a router error, logging
/// it under [`ErrorKind::RouterFailure`].
pub fn router_failure(err: impl fmt::Display) -> AppError {
    let kind = ErrorKind::RouterFailure;
    tracing::error!(kind = kind.as_str(), "{}", err);
    AppError::Router(err.to_string())
}

/// A responder-scoped failure. Reported alongside, never instead of, a
/// sibling responder's result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponderError {
    pub kind: ErrorKind,
    pub responder: Responder,
    pub message: String,
}

impl ResponderError {
    pub fn new(responder: Responder, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ResponderFailure,
            responder,
            message: message.into(),
        }
    }
}

impl fmt::Display for ResponderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} responder error: {}", self.responder, self.message)
    }
}

impl std::error::Error for ResponderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_scoped() {
        let err = ResponderError::new(Responder::Database, "gave up after 3 attempts");
        assert_eq!(err.kind, ErrorKind::ResponderFailure);
        assert_eq!(err.to_string(), "database responder error: gave up after 3 attempts");
        assert_eq!(
            serde_json::to_string(&ErrorKind::RouterFailure).unwrap(),
            "\"ROUTER_FAILURE\""
        );
    }

    #[test]
    fn test_router_failure_wraps_cause() {
        let err = router_failure(AppError::Llm("quota exceeded".into()));
        match err {
            AppError::Router(message) => assert!(message.contains("quota exceeded")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(ErrorKind::RouterFailure.to_string(), "ROUTER_FAILURE");
    }
}
