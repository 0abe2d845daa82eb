//! Shared DuckDB connection and schema.

use crate::error::{StoreError, StoreResult};
use duckdb::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle on the backing database. Cheap to clone; every clone serializes on
/// the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) a database file and ensures the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| StoreError::Storage(e.to_string()))?;
        // Cap memory/threads; DuckDB defaults to ~80% RAM per connection
        conn.execute_batch("PRAGMA memory_limit='64MB'; PRAGMA threads=1;")
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// In-memory database for tests and tooling.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.ensure_tables()?;
        Ok(db)
    }

    pub(crate) fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS survey_keyrings (
                survey_id VARCHAR NOT NULL,
                strategy VARCHAR NOT NULL,
                record VARCHAR NOT NULL,
                created_at BIGINT NOT NULL,
                PRIMARY KEY (survey_id, strategy)
            );
            CREATE TABLE IF NOT EXISTS org_keys (
                org_id VARCHAR PRIMARY KEY,
                record VARCHAR NOT NULL,
                created_at BIGINT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS survey_responses (
                id VARCHAR PRIMARY KEY,
                survey_id VARCHAR NOT NULL,
                answers VARCHAR,
                sealed_answers VARCHAR,
                sealed_demographics VARCHAR,
                submitted_at BIGINT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS audit_log (
                id VARCHAR PRIMARY KEY,
                survey_id VARCHAR NOT NULL,
                event VARCHAR NOT NULL,
                recorded_at BIGINT NOT NULL
            );",
        )
        .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Runs `f` inside a transaction on an already-locked connection, rolling
/// back on any error.
pub(crate) fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> StoreResult<T>,
) -> StoreResult<T> {
    conn.execute_batch("BEGIN TRANSACTION;")
        .map_err(|e| StoreError::Storage(e.to_string()))?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT;")
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(value)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK;");
            Err(e)
        }
    }
}
