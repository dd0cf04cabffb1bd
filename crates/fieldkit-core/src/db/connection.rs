//! Database connection management

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

use super::migrations;

/// Wrapper around the local `SQLite` store.
///
/// Opening runs migrations; open failures surface as
/// [`crate::Error::StorageUnavailable`] so callers can treat a missing or
/// quota-denied store as a blocking precondition.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let database = Self { conn };
        database.configure()?;
        database.migrate()?;
        Ok(database)
    }

    /// Configure `SQLite` for durability and concurrency.
    fn configure(&self) -> Result<()> {
        // WAL and cache tuning are best-effort; in-memory databases reject some pragmas
        self.conn.pragma_update(None, "journal_mode", "WAL").ok();
        self.conn.pragma_update(None, "synchronous", "NORMAL").ok();
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.conn.pragma_update(None, "cache_size", 10_000).ok();
        Ok(())
    }

    /// Run database migrations.
    fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn)
    }

    /// Get a reference to the underlying connection.
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get a mutable reference for transactional multi-table writes.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Verify the store accepts writes.
    ///
    /// Acquires and immediately releases a write lock; failure means the
    /// store is unusable for offline work.
    pub fn probe_writable(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE; ROLLBACK;")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn open_in_memory_runs_migrations() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'sync_queue'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn probe_writable_succeeds_on_healthy_store() {
        let db = Database::open_in_memory().unwrap();
        db.probe_writable().unwrap();
    }

    #[test]
    fn open_reports_storage_unavailable_for_bad_path() {
        let error = Database::open("/definitely/not/a/real/dir/fieldkit.db").unwrap_err();
        assert!(matches!(error, Error::StorageUnavailable(_)));
    }
}
