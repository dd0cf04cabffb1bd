//! Sync queue repository implementation

use crate::error::{Error, Result};
use crate::models::{QueueEntry, QueueEntryId};
use rusqlite::{params, Connection};

use super::parse_column;

/// Pending/failed tallies over the queue table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounts {
    /// Entries still inside their retry budget.
    pub pending: usize,
    /// Exhausted entries, conflicts excluded.
    pub failed: usize,
}

/// Trait for sync queue storage operations
pub trait QueueRepository {
    /// Insert a new queue entry
    fn insert(&self, entry: &QueueEntry) -> Result<()>;

    /// Persist retry/conflict bookkeeping for an entry
    fn update(&self, entry: &QueueEntry) -> Result<()>;

    /// Get an entry by ID
    fn get(&self, id: &QueueEntryId) -> Result<Option<QueueEntry>>;

    /// Delete an entry (after a confirmed push)
    fn delete(&self, id: &QueueEntryId) -> Result<()>;

    /// Entries with budget left, in strict creation order across all kinds
    fn list_eligible(&self) -> Result<Vec<QueueEntry>>;

    /// Every entry, in creation order (operator inspection)
    fn list_all(&self) -> Result<Vec<QueueEntry>>;

    /// Reset exhausted, non-conflict entries to a fresh budget.
    ///
    /// Returns the entries that were reset so callers can restore their
    /// entities to `pending`.
    fn reset_exhausted(&self) -> Result<Vec<QueueEntry>>;

    /// Delete exhausted entries whose last attempt is older than the cutoff
    fn purge_exhausted_before(&self, cutoff_ms: i64) -> Result<usize>;

    /// Pending/failed tallies
    fn counts(&self) -> Result<QueueCounts>;

    /// Error message of the most recently failed attempt, if any
    fn most_recent_error(&self) -> Result<Option<String>>;
}

/// `SQLite` implementation of `QueueRepository`
pub struct SqliteQueueRepository<'a> {
    conn: &'a Connection,
}

const SELECT_COLUMNS: &str = "id, entity_kind, entity_id, action, payload, retry_count, \
     max_retries, conflict, last_attempt_at, last_error, created_at";

impl<'a> SqliteQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
        let id: String = row.get(0)?;
        let entity_kind: String = row.get(1)?;
        let action: String = row.get(3)?;
        Ok(QueueEntry {
            id: parse_column(0, &id)?,
            entity_kind: parse_column(1, &entity_kind)?,
            entity_id: row.get(2)?,
            action: parse_column(3, &action)?,
            payload: row.get(4)?,
            retry_count: row.get(5)?,
            max_retries: row.get(6)?,
            conflict: row.get::<_, i32>(7)? != 0,
            last_attempt_at: row.get(8)?,
            last_error: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

impl QueueRepository for SqliteQueueRepository<'_> {
    fn insert(&self, entry: &QueueEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_queue
             (id, entity_kind, entity_id, action, payload, retry_count, max_retries,
              conflict, last_attempt_at, last_error, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.id.as_str(),
                entry.entity_kind.as_str(),
                entry.entity_id,
                entry.action.as_str(),
                entry.payload,
                entry.retry_count,
                entry.max_retries,
                i32::from(entry.conflict),
                entry.last_attempt_at,
                entry.last_error,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    fn update(&self, entry: &QueueEntry) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE sync_queue
             SET retry_count = ?, max_retries = ?, conflict = ?, last_attempt_at = ?,
                 last_error = ?, payload = ?
             WHERE id = ?",
            params![
                entry.retry_count,
                entry.max_retries,
                i32::from(entry.conflict),
                entry.last_attempt_at,
                entry.last_error,
                entry.payload,
                entry.id.as_str(),
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(entry.id.to_string()));
        }
        Ok(())
    }

    fn get(&self, id: &QueueEntryId) -> Result<Option<QueueEntry>> {
        let result = self.conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM sync_queue WHERE id = ?"),
            params![id.as_str()],
            Self::parse_entry,
        );

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &QueueEntryId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM sync_queue WHERE id = ?", params![id.as_str()])?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn list_eligible(&self) -> Result<Vec<QueueEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM sync_queue
             WHERE retry_count < max_retries
             ORDER BY created_at ASC, id ASC"
        ))?;

        let entries = stmt
            .query_map([], Self::parse_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn list_all(&self) -> Result<Vec<QueueEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM sync_queue ORDER BY created_at ASC, id ASC"
        ))?;

        let entries = stmt
            .query_map([], Self::parse_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn reset_exhausted(&self) -> Result<Vec<QueueEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM sync_queue
             WHERE retry_count >= max_retries AND conflict = 0
             ORDER BY created_at ASC, id ASC"
        ))?;

        let exhausted = stmt
            .query_map([], Self::parse_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        self.conn.execute(
            "UPDATE sync_queue
             SET retry_count = 0, last_error = NULL
             WHERE retry_count >= max_retries AND conflict = 0",
            [],
        )?;

        Ok(exhausted)
    }

    fn purge_exhausted_before(&self, cutoff_ms: i64) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM sync_queue
             WHERE retry_count >= max_retries
               AND last_attempt_at IS NOT NULL
               AND last_attempt_at < ?",
            params![cutoff_ms],
        )?;
        Ok(deleted)
    }

    fn counts(&self) -> Result<QueueCounts> {
        let pending: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE retry_count < max_retries",
            [],
            |row| row.get(0),
        )?;
        let failed: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM sync_queue WHERE retry_count >= max_retries AND conflict = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(QueueCounts { pending, failed })
    }

    fn most_recent_error(&self) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT last_error FROM sync_queue
             WHERE last_error IS NOT NULL
             ORDER BY last_attempt_at DESC
             LIMIT 1",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(message) => Ok(message),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
