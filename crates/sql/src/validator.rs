//! Three-phase static validation of candidate statements.
//!
//! Phases run cheapest first and stop at the first failure:
//! security (read-only, single statement, no comments), intent (target
//! table plus the configured [`IntentPolicy`]) and syntax.

use crate::error::ErrorKind;
use crate::policy::{IntentPolicy, KeywordIntentPolicy};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tradewise_core::{AppError, AppResult};

const DANGEROUS_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "UPDATE", "INSERT", "TRUNCATE", "ALTER", "CREATE", "GRANT", "REVOKE",
    "EXECUTE", "EXEC",
];

/// Outcome of one validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub valid: bool,

    #[serde(rename = "errorKind", skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    pub message: String,
}

impl ValidationVerdict {
    pub fn pass() -> Self {
        Self {
            valid: true,
            error_kind: None,
            message: "OK".to_string(),
        }
    }

    pub fn fail(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error_kind: Some(kind),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_kind {
            Some(kind) => write!(f, "{}: {}", kind, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Statement validator for one target table.
pub struct QueryValidator {
    table: String,
    policy: Box<dyn IntentPolicy>,
    dangerous: Regex,
}

impl QueryValidator {
    pub fn new(table: impl Into<String>, policy: Box<dyn IntentPolicy>) -> AppResult<Self> {
        let pattern = format!(r"(?i)\b(?:{})\b", DANGEROUS_KEYWORDS.join("|"));
        let dangerous = Regex::new(&pattern)
            .map_err(|e| AppError::Other(format!("Invalid validator pattern: {}", e)))?;

        Ok(Self {
            table: table.into(),
            policy,
            dangerous,
        })
    }

    /// Validator using [`KeywordIntentPolicy::default`].
    pub fn with_default_policy(table: impl Into<String>) -> AppResult<Self> {
        Self::new(table, Box::new(KeywordIntentPolicy::default()))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run all three phases.
    pub fn validate(&self, sql: &str, intent: &str) -> ValidationVerdict {
        let verdict = if let Err(message) = self.security_check(sql) {
            ValidationVerdict::fail(ErrorKind::SecurityViolation, message)
        } else if let Err(message) = self.intent_check(sql, intent) {
            ValidationVerdict::fail(ErrorKind::IntentViolation, message)
        } else if let Err(message) = syntax_check(sql) {
            ValidationVerdict::fail(ErrorKind::SyntaxError, message)
        } else {
            ValidationVerdict::pass()
        };

        tracing::debug!(valid = verdict.valid, kind = ?verdict.error_kind, "Validated statement");
        verdict
    }

    pub fn security_check(&self, sql: &str) -> Result<(), String> {
        let first_token = sql
            .trim()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .next()
            .unwrap_or_default();
        if !first_token.eq_ignore_ascii_case("SELECT") {
            return Err("Only SELECT queries allowed.".to_string());
        }

        if self.dangerous.is_match(sql) || sql.contains("--") || sql.contains("/*") {
            return Err("Dangerous operation detected.".to_string());
        }

        if has_trailing_statement(sql) {
            return Err("Multiple statements not allowed.".to_string());
        }

        Ok(())
    }

    pub fn intent_check(&self, sql: &str, intent: &str) -> Result<(), String> {
        if !sql.to_uppercase().contains(&self.table.to_uppercase()) {
            return Err(format!("Must reference '{}' table.", self.table));
        }
        self.policy.check(sql, intent)
    }
}

/// Both clause keywords present and parentheses balanced.
pub fn syntax_check(sql: &str) -> Result<(), String> {
    let upper = sql.to_uppercase();
    let words: Vec<&str> = upper
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .collect();
    if !words.contains(&"SELECT") || !words.contains(&"FROM") {
        return Err("Missing SELECT or FROM.".to_string());
    }

    if sql.matches('(').count() != sql.matches(')').count() {
        return Err("Unbalanced parentheses.".to_string());
    }

    Ok(())
}

/// A `;` followed by anything other than whitespace.
fn has_trailing_statement(sql: &str) -> bool {
    sql.match_indices(';')
        .any(|(idx, _)| sql[idx + 1..].chars().any(|c| !c.is_whitespace()))
}
