//! Validate, execute and bound one candidate statement.
//!
//! The gateway never retries; the caller owns the attempt budget and uses
//! [`ExecutionResult::feedback`] to regenerate the statement.

use crate::error::{ErrorKind, StoreError};
use crate::result::ResultSet;
use crate::store::DataStore;
use crate::validator::QueryValidator;
use crate::visualization::VisualizationPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Attempts a caller may make for one question.
pub const MAX_ATTEMPTS: u32 = 3;

/// Rows shown in the preview.
pub const PREVIEW_ROWS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    ValidationFailed,
    ExecutionError,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub status: ExecutionStatus,

    pub attempt: u32,

    /// First rows only, see [`PREVIEW_ROWS`]
    pub rows: Option<ResultSet>,

    /// True row count before truncation
    pub total_rows: usize,

    pub visualization_recommended: bool,

    /// Untruncated rows, kept only when a chart is recommended
    pub full_rows: Option<ResultSet>,

    pub error_kind: Option<ErrorKind>,

    pub error: Option<String>,
}

impl ExecutionResult {
    fn failure(status: ExecutionStatus, kind: ErrorKind, attempt: u32, error: String) -> Self {
        Self {
            status,
            attempt,
            rows: None,
            total_rows: 0,
            visualization_recommended: false,
            full_rows: None,
            error_kind: Some(kind),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Text handed back to the statement generator.
    pub fn feedback(&self) -> String {
        let error = self.error.as_deref().unwrap_or_default();
        match self.status {
            ExecutionStatus::ValidationFailed => format!(
                "VALIDATION FAILED (Attempt {}/{})\n\n{}\n\nACTION: Fix the issue and retry.",
                self.attempt, MAX_ATTEMPTS, error
            ),
            ExecutionStatus::ExecutionError => format!(
                "EXECUTION ERROR (Attempt {}/{})\n\n{}",
                self.attempt, MAX_ATTEMPTS, error
            ),
            ExecutionStatus::Success => {
                let rows = match &self.rows {
                    Some(rows) if !rows.is_empty() => rows,
                    _ => return "VALIDATION PASSED\nEXECUTION SUCCESSFUL\nNo results returned.".to_string(),
                };

                let mut table = rows.render_table(PREVIEW_ROWS);
                if self.total_rows > rows.len() {
                    table.push_str(&format!("\n... +{} more", self.total_rows - rows.len()));
                }

                let mut out = format!(
                    "VALIDATION PASSED\nEXECUTION SUCCESSFUL\n\n{}\n\nRows: {}",
                    table, self.total_rows
                );
                if self.visualization_recommended {
                    out.push_str("\n\n[VISUALIZATION_RECOMMENDED]");
                }
                out
            }
        }
    }
}

/// Single entry point to the data store.
#[derive(Clone)]
pub struct ExecutionGateway {
    validator: Arc<QueryValidator>,
    store: Arc<dyn DataStore>,
    visualization: VisualizationPolicy,
}

impl ExecutionGateway {
    pub fn new(
        validator: Arc<QueryValidator>,
        store: Arc<dyn DataStore>,
        visualization: VisualizationPolicy,
    ) -> Self {
        Self {
            validator,
            store,
            visualization,
        }
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    pub async fn execute(&self, sql: &str, intent: &str, attempt: u32) -> ExecutionResult {
        let verdict = self.validator.validate(sql, intent);
        if !verdict.valid {
            let kind = verdict.error_kind.unwrap_or(ErrorKind::SyntaxError);
            tracing::info!(attempt, kind = %kind, "Statement rejected: {}", verdict.message);
            return ExecutionResult::failure(
                ExecutionStatus::ValidationFailed,
                kind,
                attempt,
                verdict.to_string(),
            );
        }

        let rows = match self.store.fetch(sql).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::info!(attempt, "Statement failed: {}", err);
                return ExecutionResult::failure(
                    ExecutionStatus::ExecutionError,
                    ErrorKind::ExecutionError,
                    attempt,
                    execution_guidance(&err),
                );
            }
        };

        let total_rows = rows.len();
        let visualization_recommended = self.visualization.should_visualize(intent, &rows).await;
        tracing::info!(attempt, total_rows, visualization_recommended, "Statement executed");

        ExecutionResult {
            status: ExecutionStatus::Success,
            attempt,
            rows: Some(rows.head(PREVIEW_ROWS)),
            total_rows,
            visualization_recommended,
            full_rows: visualization_recommended.then_some(rows),
            error_kind: None,
            error: None,
        }
    }
}

fn execution_guidance(err: &StoreError) -> String {
    match err {
        StoreError::ColumnNotFound(column) => format!(
            "Column '{}' not found.\n\nSOLUTION:\n\
             1. Call get_schema for exact names\n\
             2. Use double quotes for mixed-case: \"Daily_PnL\"\n\
             3. Retry with corrected query",
            column
        ),
        other => format!("{}\n\nSOLUTION: Fix SQL and retry.", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ColumnInfo;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeStore {
        result: fn() -> Result<ResultSet, StoreError>,
        fetches: AtomicUsize,
    }

    impl FakeStore {
        fn new(result: fn() -> Result<ResultSet, StoreError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DataStore for FakeStore {
        async fn fetch(&self, _sql: &str) -> Result<ResultSet, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }

        async fn fetch_schema(&self, _table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn gateway(store: Arc<FakeStore>) -> ExecutionGateway {
        ExecutionGateway::new(
            Arc::new(QueryValidator::with_default_policy("forex_trades").unwrap()),
            store,
            VisualizationPolicy::new(),
        )
    }

    fn daily_rows(count: usize) -> ResultSet {
        ResultSet::new(
            vec!["Trade_Date".into(), "Daily_PnL".into()],
            (0..count)
                .map(|i| vec![json!(format!("2024-01-{:02}", i + 1)), json!(i as f64)])
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_invalid_statement_never_reaches_store() {
        let store = FakeStore::new(|| Ok(ResultSet::default()));
        let result = gateway(store.clone())
            .execute("DELETE FROM forex_trades", "clear", 2)
            .await;

        assert_eq!(result.status, ExecutionStatus::ValidationFailed);
        assert_eq!(result.error_kind, Some(ErrorKind::SecurityViolation));
        assert_eq!(result.attempt, 2);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(
            result.feedback(),
            "VALIDATION FAILED (Attempt 2/3)\n\nSECURITY_VIOLATION: Only SELECT queries allowed.\n\nACTION: Fix the issue and retry."
        );
    }

    #[tokio::test]
    async fn test_missing_column_guidance() {
        let store = FakeStore::new(|| Err(StoreError::ColumnNotFound("daily_pnl".to_string())));
        let result = gateway(store)
            .execute("SELECT daily_pnl FROM forex_trades", "list pnl", 1)
            .await;

        assert_eq!(result.status, ExecutionStatus::ExecutionError);
        assert_eq!(result.error_kind, Some(ErrorKind::ExecutionError));
        let feedback = result.feedback();
        assert!(feedback.starts_with("EXECUTION ERROR (Attempt 1/3)"));
        assert!(feedback.contains("Column 'daily_pnl' not found."));
        assert!(feedback.contains("get_schema"));
    }

    #[tokio::test]
    async fn test_timeout_is_execution_error() {
        let store = FakeStore::new(|| Err(StoreError::Timeout(Duration::from_secs(3))));
        let result = gateway(store)
            .execute("SELECT * FROM forex_trades", "list trades", 3)
            .await;

        assert_eq!(result.status, ExecutionStatus::ExecutionError);
        assert!(result.feedback().contains("timeout"));
    }

    #[tokio::test]
    async fn test_success_previews_and_keeps_full_rows_for_chart() {
        let store = FakeStore::new(|| Ok(daily_rows(20)));
        let result = gateway(store)
            .execute(
                "SELECT \"Trade_Date\", \"Daily_PnL\" FROM forex_trades",
                "daily pnl trend",
                1,
            )
            .await;

        assert!(result.is_success());
        assert_eq!(result.total_rows, 20);
        assert_eq!(result.rows.as_ref().unwrap().len(), PREVIEW_ROWS);
        assert!(result.visualization_recommended);
        assert_eq!(result.full_rows.as_ref().unwrap().len(), 20);

        let feedback = result.feedback();
        assert!(feedback.contains("Trade_Date | Daily_PnL"));
        assert!(feedback.contains("... +5 more"));
        assert!(feedback.contains("Rows: 20"));
        assert!(feedback.ends_with("[VISUALIZATION_RECOMMENDED]"));
    }

    #[tokio::test]
    async fn test_scalar_result_has_no_chart() {
        let store = FakeStore::new(|| {
            Ok(ResultSet::new(vec!["total".into()], vec![vec![json!(812.4)]]))
        });
        let result = gateway(store)
            .execute("SELECT SUM(\"Daily_PnL\") FROM forex_trades", "total profit", 1)
            .await;

        assert!(result.is_success());
        assert!(!result.visualization_recommended);
        assert!(result.full_rows.is_none());
        assert_eq!(
            result.feedback(),
            "VALIDATION PASSED\nEXECUTION SUCCESSFUL\n\ntotal\n-----\n812.4\n\nRows: 1"
        );
    }

    #[tokio::test]
    async fn test_empty_result() {
        let store = FakeStore::new(|| Ok(ResultSet::new(vec!["x".into()], vec![])));
        let result = gateway(store)
            .execute("SELECT x FROM forex_trades WHERE 1 = 0", "list x", 1)
            .await;

        assert!(result.is_success());
        assert_eq!(result.total_rows, 0);
        assert!(result.feedback().ends_with("No results returned."));
    }
}
