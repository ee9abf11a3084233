//! Bounded pool of read-only SQLite connections.
//!
//! A semaphore caps concurrent checkouts at `max_size`; idle connections are
//! kept for reuse. A [`PooledConnection`] hands its connection back when
//! dropped, on every exit path.

use crate::error::StoreError;
use rusqlite::{Connection, OpenFlags};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tradewise_core::config::DatabaseConfig;
use tradewise_core::{AppError, AppResult};

/// Pool sizing and timeouts.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub min_size: usize,
    pub max_size: usize,
    pub acquire_timeout: Duration,
}

impl From<&DatabaseConfig> for PoolOptions {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            min_size: config.min_connections,
            max_size: config.max_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
        }
    }
}

struct PoolInner {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    options: PoolOptions,
}

impl PoolInner {
    fn release(&self, conn: Connection) {
        match self.idle.lock() {
            Ok(mut idle) => idle.push(conn),
            // poisoned: let the connection close
            Err(_) => tracing::warn!("Connection pool lock poisoned, dropping connection"),
        }
    }
}

/// Shared handle to the pool.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Open `min_size` connections eagerly; fails if the file cannot be
    /// opened read-only.
    pub fn open(path: &Path, options: PoolOptions) -> AppResult<Self> {
        if options.max_size == 0 || options.min_size > options.max_size {
            return Err(AppError::Config(format!(
                "Invalid pool size: min {} / max {}",
                options.min_size, options.max_size
            )));
        }

        let mut idle = Vec::with_capacity(options.max_size);
        for _ in 0..options.min_size.max(1) {
            idle.push(open_read_only(path).map_err(AppError::from)?);
        }

        tracing::info!(
            "Opened read-only pool on {:?} ({} idle, max {})",
            path,
            idle.len(),
            options.max_size
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                path: path.to_path_buf(),
                idle: Mutex::new(idle),
                permits: Arc::new(Semaphore::new(options.max_size)),
                options,
            }),
        })
    }

    /// Check out a connection, waiting up to the acquire timeout.
    pub async fn acquire(&self) -> Result<PooledConnection, StoreError> {
        let timeout = self.inner.options.acquire_timeout;
        let permit = tokio::time::timeout(timeout, self.inner.permits.clone().acquire_owned())
            .await
            .map_err(|_| StoreError::Pool(format!("Timed out after {:?} waiting for a connection", timeout)))?
            .map_err(|_| StoreError::Pool("Connection pool closed".to_string()))?;

        let reused = self
            .inner
            .idle
            .lock()
            .map_err(|_| StoreError::Pool("Connection pool lock poisoned".to_string()))?
            .pop();

        let conn = match reused {
            Some(conn) => conn,
            None => open_read_only(&self.inner.path)?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    pub fn max_size(&self) -> usize {
        self.inner.options.max_size
    }

    /// Connections currently available without opening a new one.
    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    /// Checkouts that would not have to wait.
    pub fn available_permits(&self) -> usize {
        self.inner.permits.available_permits()
    }
}

/// A checked-out connection; returns to the pool on drop.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `drop` takes the connection out
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

fn open_read_only(path: &Path) -> Result<Connection, StoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)
        .map_err(|e| StoreError::Pool(format!("Failed to open {:?} read-only: {}", path, e)))?;
    conn.pragma_update(None, "query_only", true)
        .map_err(|e| StoreError::Pool(format!("Failed to set query_only: {}", e)))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn database(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("trades.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        path
    }

    fn options(min: usize, max: usize) -> PoolOptions {
        PoolOptions {
            min_size: min,
            max_size: max,
            acquire_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_connection_returned_on_drop() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::open(&database(&dir), options(2, 4)).unwrap();
        assert_eq!(pool.idle_count(), 2);

        {
            let conn = pool.acquire().await.unwrap();
            let x: i64 = conn.query_row("SELECT x FROM t", [], |r| r.get(0)).unwrap();
            assert_eq!(x, 1);
            assert_eq!(pool.idle_count(), 1);
            assert_eq!(pool.available_permits(), 3);
        }

        assert_eq!(pool.idle_count(), 2);
        assert_eq!(pool.available_permits(), 4);
    }

    #[tokio::test]
    async fn test_acquire_times_out_when_exhausted() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::open(&database(&dir), options(1, 1)).unwrap();

        let _held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.err().unwrap();
        assert!(matches!(err, StoreError::Pool(_)));
    }

    #[tokio::test]
    async fn test_connections_are_read_only() {
        let dir = TempDir::new().unwrap();
        let pool = ConnectionPool::open(&database(&dir), options(1, 2)).unwrap();

        let conn = pool.acquire().await.unwrap();
        assert!(conn.execute("INSERT INTO t VALUES (2)", []).is_err());
    }

    #[test]
    fn test_invalid_sizes_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = database(&dir);
        assert!(ConnectionPool::open(&path, options(3, 2)).is_err());
        assert!(ConnectionPool::open(&path, options(0, 0)).is_err());
        assert!(ConnectionPool::open(&dir.path().join("missing.db"), options(1, 2)).is_err());
    }
}
