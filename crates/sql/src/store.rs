//! Read-only data store boundary.

use crate::error::StoreError;
use crate::pool::ConnectionPool;
use crate::result::ResultSet;
use async_trait::async_trait;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// SQLite VM instructions between cancellation checks.
const PROGRESS_OPS: i32 = 1000;

/// Column metadata from the store catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// What the gateway needs from a store. Only validated statements reach
/// `fetch`.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn fetch(&self, sql: &str) -> Result<ResultSet, StoreError>;

    /// Columns in declaration order; empty when the table does not exist.
    async fn fetch_schema(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), StoreError> {
        self.fetch("SELECT 1").await.map(|_| ())
    }
}

/// SQLite store over the read-only pool, with a per-statement timeout.
#[derive(Clone)]
pub struct SqliteStore {
    pool: ConnectionPool,
    statement_timeout: Duration,
}

impl SqliteStore {
    pub fn new(pool: ConnectionPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Run a blocking closure on a pooled connection. On timeout the
    /// statement is cancelled whether or not it has started; the connection
    /// returns to the pool once the closure unwinds.
    async fn with_connection<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.pool.acquire().await?;
        let interrupt = conn.get_interrupt_handle();
        let cancelled = Arc::new(AtomicBool::new(false));
        let timeout = self.statement_timeout;

        let task = tokio::task::spawn_blocking({
            let cancelled = Arc::clone(&cancelled);
            move || run_cancellable(&conn, cancelled, timeout, work)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(StoreError::Query(format!(
                "Statement task failed: {}",
                join_error
            ))),
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                interrupt.interrupt();
                tracing::warn!("Statement cancelled after {:?}", timeout);
                Err(StoreError::Timeout(timeout))
            }
        }
    }
}

/// Run `work` unless already cancelled, aborting it mid-statement once the
/// flag is raised. The progress handler is cleared before the connection is
/// reused.
fn run_cancellable<T, F>(
    conn: &Connection,
    cancelled: Arc<AtomicBool>,
    timeout: Duration,
    work: F,
) -> Result<T, StoreError>
where
    F: FnOnce(&Connection) -> Result<T, StoreError>,
{
    if cancelled.load(Ordering::SeqCst) {
        tracing::debug!("Statement cancelled before it started");
        return Err(StoreError::Timeout(timeout));
    }

    let flag = Arc::clone(&cancelled);
    conn.progress_handler(PROGRESS_OPS, Some(move || flag.load(Ordering::SeqCst)));
    let result = work(conn);
    conn.progress_handler(0, None::<fn() -> bool>);

    match result {
        Err(_) if cancelled.load(Ordering::SeqCst) => Err(StoreError::Timeout(timeout)),
        other => other,
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn fetch(&self, sql: &str) -> Result<ResultSet, StoreError> {
        let sql = sql.trim().trim_end_matches(';').to_string();
        self.with_connection(move |conn| run_query(conn, &sql)).await
    }

    async fn fetch_schema(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
        let table = table.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
                .map_err(classify)?;
            let columns = stmt
                .query_map([&table], |row| {
                    Ok(ColumnInfo {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                    })
                })
                .map_err(classify)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(classify)?;
            Ok(columns)
        })
        .await
    }
}

fn run_query(conn: &Connection, sql: &str) -> Result<ResultSet, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(classify)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(classify)?;
    while let Some(row) = cursor.next().map_err(classify)? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(to_json(row.get_ref(idx).map_err(classify)?));
        }
        rows.push(values);
    }

    Ok(ResultSet::new(columns, rows))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

/// Map a SQLite error, pulling the column name out of "no such column".
fn classify(err: rusqlite::Error) -> StoreError {
    let message = err.to_string();
    match missing_column(&message) {
        Some(column) => StoreError::ColumnNotFound(column),
        None => StoreError::Query(message),
    }
}

fn missing_column(message: &str) -> Option<String> {
    let re = Regex::new(r"no such column:\s*([^\s]+)").ok()?;
    re.captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolOptions;
    use serde_json::json;
    use tempfile::TempDir;

    fn store(dir: &TempDir, timeout: Duration) -> SqliteStore {
        let path = dir.path().join("trades.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE forex_trades ("Trade_Date" TEXT, "Symbol" TEXT, "Daily_PnL" REAL, "Lots" INTEGER);
            INSERT INTO forex_trades VALUES ('2024-01-01', 'EURUSD', 12.5, 2);
            INSERT INTO forex_trades VALUES ('2024-01-02', 'GBPUSD', NULL, 1);
            "#,
        )
        .unwrap();

        let pool = ConnectionPool::open(
            &path,
            PoolOptions {
                min_size: 1,
                max_size: 2,
                acquire_timeout: Duration::from_secs(1),
            },
        )
        .unwrap();
        SqliteStore::new(pool, timeout)
    }

    #[tokio::test]
    async fn test_fetch_preserves_columns_and_types() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Duration::from_secs(3));

        let rs = store
            .fetch("SELECT \"Symbol\", \"Daily_PnL\", \"Lots\" FROM forex_trades ORDER BY \"Trade_Date\";")
            .await
            .unwrap();
        assert_eq!(rs.columns, vec!["Symbol", "Daily_PnL", "Lots"]);
        assert_eq!(rs.rows[0], vec![json!("EURUSD"), json!(12.5), json!(2)]);
        assert_eq!(rs.rows[1][1], Value::Null);
    }

    #[tokio::test]
    async fn test_missing_column_classified() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Duration::from_secs(3));

        let err = store.fetch("SELECT daily_profit FROM forex_trades").await.unwrap_err();
        match err {
            StoreError::ColumnNotFound(column) => assert_eq!(column, "daily_profit"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_schema_in_declaration_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Duration::from_secs(3));

        let columns = store.fetch_schema("forex_trades").await.unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Trade_Date", "Symbol", "Daily_PnL", "Lots"]);
        assert_eq!(columns[2].data_type, "REAL");

        assert!(store.fetch_schema("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_long_statement_times_out() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Duration::from_millis(50));

        let err = store
            .fetch(ENDLESS)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        assert!(store.ping().await.is_ok());
    }

    const ENDLESS: &str = "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n) \
                           SELECT COUNT(*) FROM n";

    #[test]
    fn test_cancelled_statement_never_starts() {
        let conn = Connection::open_in_memory().unwrap();
        let cancelled = Arc::new(AtomicBool::new(true));
        let mut ran = false;

        let err = run_cancellable(&conn, cancelled, Duration::from_secs(1), |conn| {
            ran = true;
            run_query(conn, ENDLESS)
        })
        .unwrap_err();

        assert!(matches!(err, StoreError::Timeout(_)));
        assert!(!ran);
    }

    #[test]
    fn test_cancel_flag_stops_running_statement() {
        let conn = Connection::open_in_memory().unwrap();
        let cancelled = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&cancelled);
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
        });

        let err = run_cancellable(&conn, cancelled, Duration::from_millis(50), |conn| {
            run_query(conn, ENDLESS)
        })
        .unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, StoreError::Timeout(_)));

        // handler is cleared, so the connection is usable again
        let rs = run_query(&conn, "SELECT 1").unwrap();
        assert_eq!(rs.rows, vec![vec![json!(1)]]);
    }

    #[test]
    fn test_missing_column_extraction() {
        assert_eq!(
            missing_column("no such column: \"Daily_Pnl\" in SELECT"),
            Some("Daily_Pnl".to_string())
        );
        assert_eq!(missing_column("no such table: x"), None);
    }
}
