//! Offline session repository implementation

use crate::error::{Error, Result};
use crate::models::{OfflineSession, SessionId};
use rusqlite::{params, Connection};

use super::parse_column;

/// Trait for offline session storage operations
pub trait SessionRepository {
    /// Insert or replace a session record
    fn upsert(&self, session: &OfflineSession) -> Result<()>;

    /// Get a session by ID
    fn get(&self, id: &SessionId) -> Result<Option<OfflineSession>>;

    /// List a review's sessions, most recent first
    fn list_by_review(&self, review_id: &str) -> Result<Vec<OfflineSession>>;

    /// Record the timestamp of a confirmed remote push
    fn mark_synced(&self, id: &str, synced_at: i64) -> Result<()>;
}

/// `SQLite` implementation of `SessionRepository`
pub struct SqliteSessionRepository<'a> {
    conn: &'a Connection,
}

const SELECT_COLUMNS: &str = "id, review_id, user_id, device, started_at, ended_at, synced_at";

impl<'a> SqliteSessionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<OfflineSession> {
        let id: String = row.get(0)?;
        Ok(OfflineSession {
            id: parse_column(0, &id)?,
            review_id: row.get(1)?,
            user_id: row.get(2)?,
            device: row.get(3)?,
            started_at: row.get(4)?,
            ended_at: row.get(5)?,
            synced_at: row.get(6)?,
        })
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn upsert(&self, session: &OfflineSession) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO offline_sessions
             (id, review_id, user_id, device, started_at, ended_at, synced_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                session.id.as_str(),
                session.review_id,
                session.user_id,
                session.device,
                session.started_at,
                session.ended_at,
                session.synced_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &SessionId) -> Result<Option<OfflineSession>> {
        let result = self.conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM offline_sessions WHERE id = ?"),
            params![id.as_str()],
            Self::parse_session,
        );

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_by_review(&self, review_id: &str) -> Result<Vec<OfflineSession>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM offline_sessions
             WHERE review_id = ?
             ORDER BY started_at DESC, id DESC"
        ))?;

        let sessions = stmt
            .query_map(params![review_id], Self::parse_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sessions)
    }

    fn mark_synced(&self, id: &str, synced_at: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE offline_sessions SET synced_at = ? WHERE id = ?",
            params![synced_at, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}
