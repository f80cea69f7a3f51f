//! Database connection management
//!
//! This module provides the connection wrapper shared by every review entity manager.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::time::Duration;

/// How long a statement waits on a lock held by another process before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections,
/// handling both file-based and in-memory databases with consistent
/// configuration and error handling.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    /// Configure the connection: WAL journal, lock wait, foreign key enforcement
    fn configure(&self) -> Result<()> {
        // Readers keep working while the desktop app writes
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to set journal mode: {}", e))?;

        self.conn
            .execute("PRAGMA synchronous=NORMAL", [])
            .map_err(|e| anyhow!("Failed to set synchronous mode: {}", e))?;

        self.conn
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| anyhow!("Failed to set busy timeout: {}", e))?;

        // Screenshot and session deletes rely on ON DELETE CASCADE / SET NULL
        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;

        Ok(())
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Begin an unchecked transaction
    ///
    /// Used by batch operations such as screenshot reordering.
    pub fn transaction(&self) -> Result<rusqlite::Transaction<'_>> {
        self.conn
            .unchecked_transaction()
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        table_exists(&self.conn, table_name)
    }

    /// Check if a column exists on a table
    pub fn column_exists(&self, table_name: &str, column_name: &str) -> Result<bool> {
        column_exists(&self.conn, table_name, column_name)
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", table_name);
        let count: i64 = self
            .conn
            .query_row(&query, [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get table count: {}", e))?;
        Ok(count.max(0) as u64)
    }

    /// Close the connection, flushing pending WAL state
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| anyhow!("Failed to close database: {}", e))
    }
}

/// Check if a table exists on a borrowed connection
pub(crate) fn table_exists(conn: &Connection, table_name: &str) -> Result<bool> {
    let count: i32 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        )
        .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
    Ok(count > 0)
}

/// Check if a column exists using `PRAGMA table_info`
pub(crate) fn column_exists(conn: &Connection, table_name: &str, column_name: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", table_name))
        .map_err(|e| anyhow!("Failed to read table info for {}: {}", table_name, e))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| anyhow!("Failed to read table info for {}: {}", table_name, e))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(|e| anyhow!("Failed to read table info for {}: {}", table_name, e))?;
    Ok(columns.iter().any(|c| c == column_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = DatabaseConn::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let enabled: i64 = db
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_table_and_column_exists() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE test_table (id INTEGER PRIMARY KEY, label TEXT)")
            .unwrap();

        assert!(db.table_exists("test_table").unwrap());
        assert!(!db.table_exists("nonexistent_table").unwrap());
        assert!(db.column_exists("test_table", "label").unwrap());
        assert!(!db.column_exists("test_table", "missing").unwrap());
    }

    #[test]
    fn test_table_count() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE test_table (id INTEGER PRIMARY KEY)")
            .unwrap();
        db.execute("INSERT INTO test_table (id) VALUES (1), (2), (3)")
            .unwrap();

        assert_eq!(db.table_count("test_table").unwrap(), 3);
    }

    #[test]
    fn test_file_database_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn.db");
        let db = DatabaseConn::open(path.to_str()).unwrap();
        db.execute("CREATE TABLE t (id INTEGER)").unwrap();
        assert!(db.close().is_ok());
        assert!(path.exists());
    }
}
